//! Marketplace payments backend.
//!
//! Reconciles PIX and Stripe webhook deliveries against an append-only
//! payment ledger and purchase entitlements, and opens hosted checkout
//! sessions with self-healing processor customers.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(feature = "test-support")]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
