//! Stripe outbound adapters.
//!
//! [`StripeCheckoutGateway`] talks to the REST API with form-encoded requests
//! and [`StripeWebhookVerifier`] authenticates `Stripe-Signature` headers.

mod dto;
mod http_client;
mod signature;

pub use http_client::{DEFAULT_STRIPE_API_BASE, StripeCheckoutGateway};
pub use signature::{DEFAULT_SIGNATURE_TOLERANCE, StripeWebhookVerifier};
