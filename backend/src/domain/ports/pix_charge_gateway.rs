//! Port for creating immediate charges at the PIX gateway.

use async_trait::async_trait;

use crate::domain::{PixCharge, PixChargeRequest, TransactionId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by PIX gateway adapters.
    pub enum PixChargeGatewayError {
        /// OAuth token exchange failed.
        Authentication { message: String } => "pix gateway authentication failed: {message}",
        /// The gateway could not be reached.
        Transport { message: String } => "pix gateway transport failed: {message}",
        /// The gateway did not answer in time.
        Timeout { message: String } => "pix gateway timed out: {message}",
        /// The gateway refused the charge.
        Rejected { status: u16, message: String } => "pix gateway rejected charge ({status}): {message}",
        /// The gateway answered with an unexpected payload.
        Decode { message: String } => "pix gateway response invalid: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PixChargeGateway: Send + Sync {
    /// Create an immediate charge under the given transaction id.
    async fn create_charge(
        &self,
        transaction_id: &TransactionId,
        request: &PixChargeRequest,
    ) -> Result<PixCharge, PixChargeGatewayError>;
}
