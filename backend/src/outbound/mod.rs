//! Outbound adapters implementing domain ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel.
//! - **stripe**: checkout gateway and webhook signature verification.
//! - **pix**: mutual-TLS PIX charge client.
//! - **metrics**: Prometheus exporters (feature-gated).
//!
//! Adapters translate between domain types and wire or row formats. They
//! contain no business rules.

#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
pub mod pix;
pub mod stripe;
