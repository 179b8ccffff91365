//! PostgreSQL persistence adapters using Diesel.
//!
//! Repositories translate between Diesel row structs and domain types and
//! nothing else. Row structs (`models.rs`) and table definitions
//! (`schema.rs`) stay private to this module.
//!
//! # Example
//!
//! ```ignore
//! use marketplace::outbound::persistence::{DbPool, DieselPixPaymentRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/marketplace")).await?;
//! let ledger = DieselPixPaymentRepository::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_payment_account_repository;
mod diesel_pix_payment_repository;
mod diesel_purchase_repository;
mod migrations;
mod models;
mod pool;
mod schema;
#[cfg(feature = "test-support")]
pub mod seed;

pub use diesel_payment_account_repository::DieselPaymentAccountRepository;
pub use diesel_pix_payment_repository::DieselPixPaymentRepository;
pub use diesel_purchase_repository::DieselPurchaseRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
