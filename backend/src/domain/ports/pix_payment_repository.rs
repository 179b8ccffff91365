//! Port abstraction for the PIX payment ledger.
//!
//! The ledger is append-only: one row per external transaction id, written on
//! first sight and never updated. It doubles as the idempotency record for
//! webhook redeliveries.

use async_trait::async_trait;

use crate::domain::{PixPayment, TransactionId};

use super::{RecordOutcome, define_port_error};

define_port_error! {
    /// Errors raised by PIX ledger adapters.
    pub enum PixPaymentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "pix ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "pix ledger query failed: {message}",
    }
}

/// Storage port for settled PIX payments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PixPaymentRepository: Send + Sync {
    /// Report whether a payment with this transaction id was already recorded.
    async fn exists(&self, transaction_id: &TransactionId)
    -> Result<bool, PixPaymentRepositoryError>;

    /// Insert the payment unless its transaction id is already present.
    ///
    /// Implementations must resolve concurrent inserts of the same id to a
    /// single row and report the loser as [`RecordOutcome::AlreadyExists`].
    async fn insert_if_absent(
        &self,
        payment: &PixPayment,
    ) -> Result<RecordOutcome, PixPaymentRepositoryError>;

    /// Load a recorded payment.
    async fn find(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PixPayment>, PixPaymentRepositoryError>;
}
