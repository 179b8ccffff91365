//! Driving port for PIX payment status lookups.

use async_trait::async_trait;

use crate::domain::{Error, PaymentStatus, TransactionId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PixPaymentQuery: Send + Sync {
    /// Status of a recorded payment, or a not-found error.
    async fn payment_status(&self, transaction_id: &TransactionId)
    -> Result<PaymentStatus, Error>;
}
