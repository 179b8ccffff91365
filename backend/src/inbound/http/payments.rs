//! PIX payment status lookup.
//!
//! ```text
//! GET /api/v1/pix/payments/{txid}
//! ```
//!
//! Storefronts poll this after showing a QR code; the transaction id is the
//! only capability needed.

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{PaymentStatus, TransactionId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::invalid_field_error;

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentStatusResponse {
    #[schema(example = "COMPLETED")]
    pub status: &'static str,
}

impl From<PaymentStatus> for PaymentStatusResponse {
    fn from(status: PaymentStatus) -> Self {
        Self {
            status: status.as_str(),
        }
    }
}

/// Fetch the recorded status of a PIX payment.
#[utoipa::path(
    get,
    path = "/api/v1/pix/payments/{txid}",
    params(("txid" = String, Path, description = "PIX transaction id")),
    responses(
        (status = 200, description = "Payment recorded", body = PaymentStatusResponse),
        (status = 400, description = "Malformed transaction id", body = ErrorSchema),
        (status = 404, description = "No payment recorded for this transaction id", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["pix"],
    operation_id = "getPixPaymentStatus",
    security([])
)]
#[get("/pix/payments/{txid}")]
pub async fn get_payment_status(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PaymentStatusResponse>> {
    let transaction_id = TransactionId::new(path.into_inner())
        .map_err(|err| invalid_field_error("txid", "invalid_txid", err.to_string()))?;
    let status = state.pix_payments.payment_status(&transaction_id).await?;
    Ok(web::Json(status.into()))
}
