//! Port authenticating and decoding payment processor webhooks.

use crate::domain::PaymentEvent;

use super::define_port_error;

define_port_error! {
    /// Errors raised while authenticating a webhook delivery.
    pub enum PaymentEventVerifierError {
        /// The signature header is missing, malformed, stale, or wrong.
        InvalidSignature { message: String } => "webhook signature rejected: {message}",
        /// The body is authentic but not a recognisable event.
        Malformed { message: String } => "webhook payload malformed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait PaymentEventVerifier: Send + Sync {
    /// Verify `signature_header` against the raw `payload` and decode it.
    fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, PaymentEventVerifierError>;
}
