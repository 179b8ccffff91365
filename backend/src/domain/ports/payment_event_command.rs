//! Driving port for payment processor webhook deliveries.

use async_trait::async_trait;

use crate::domain::{Error, PurchaseId};

/// How a verified webhook delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventOutcome {
    /// A new purchase entitlement was created.
    PurchaseCreated(PurchaseId),
    /// The checkout session already produced a purchase.
    AlreadyProcessed,
    /// The event was acknowledged without side effects.
    Ignored,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentEventCommand: Send + Sync {
    /// Authenticate and apply one raw webhook delivery.
    async fn handle_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEventOutcome, Error>;
}
