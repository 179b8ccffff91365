//! Immediate PIX charge creation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::ports::{PixChargeCommand, PixChargeGateway};
use super::service_support::map_pix_gateway_error;
use super::{Error, PixCharge, PixChargeRequest, TransactionId, UserId};

/// Service implementing [`PixChargeCommand`].
///
/// The transaction id is chosen here so the webhook that later reports the
/// settlement can be matched against the charge.
pub struct PixChargeService<G> {
    gateway: Arc<G>,
}

impl<G> PixChargeService<G> {
    /// Create a service delegating charges to `gateway`.
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<G> PixChargeCommand for PixChargeService<G>
where
    G: PixChargeGateway,
{
    async fn create_charge(
        &self,
        user_id: &UserId,
        request: PixChargeRequest,
    ) -> Result<PixCharge, Error> {
        let transaction_id = TransactionId::generate();
        let charge = self
            .gateway
            .create_charge(&transaction_id, &request)
            .await
            .map_err(map_pix_gateway_error)?;
        info!(
            %user_id,
            transaction_id = %charge.transaction_id,
            amount = %request.amount,
            status = %charge.status,
            "pix charge created"
        );
        Ok(charge)
    }
}
