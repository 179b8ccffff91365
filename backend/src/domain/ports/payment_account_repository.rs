//! Port for the local cache of payment processor customer ids.

use async_trait::async_trait;

use crate::domain::{PaymentAccount, PaymentCustomerId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment account adapters.
    pub enum PaymentAccountRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "payment account connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "payment account query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentAccountRepository: Send + Sync {
    /// Load the account for a user.
    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PaymentAccount>, PaymentAccountRepositoryError>;

    /// Replace the cached processor customer id.
    async fn store_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &PaymentCustomerId,
    ) -> Result<(), PaymentAccountRepositoryError>;
}
