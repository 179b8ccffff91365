//! Driving port for creating PIX charges on behalf of a signed-in user.

use async_trait::async_trait;

use crate::domain::{Error, PixCharge, PixChargeRequest, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PixChargeCommand: Send + Sync {
    async fn create_charge(
        &self,
        user_id: &UserId,
        request: PixChargeRequest,
    ) -> Result<PixCharge, Error>;
}
