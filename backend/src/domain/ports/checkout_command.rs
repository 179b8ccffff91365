//! Driving port for hosted checkout session creation.

use async_trait::async_trait;

use crate::domain::{CheckoutRequest, CheckoutSession, Error, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckoutCommand: Send + Sync {
    /// Create a checkout session for `user_id`, provisioning or repairing the
    /// user's processor customer first.
    async fn create_checkout_session(
        &self,
        user_id: &UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, Error>;
}
