//! PIX charge creation for signed-in users.
//!
//! ```text
//! POST /api/v1/pix/charges {"amount":"10.50","description":"Boost"}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, PixCharge, PixChargeRequest, PixValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{invalid_field_error, missing_field_error};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PixChargeBody {
    /// Decimal amount with two fraction digits.
    #[schema(example = "10.50")]
    pub amount: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PixChargeResponse {
    pub txid: String,
    #[schema(example = "ATIVA")]
    pub status: String,
    /// BR Code payload for copy-and-paste payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_paste: Option<String>,
}

impl From<PixCharge> for PixChargeResponse {
    fn from(charge: PixCharge) -> Self {
        Self {
            txid: charge.transaction_id.into(),
            status: charge.status,
            copy_paste: charge.copy_paste,
        }
    }
}

fn parse_charge_body(body: PixChargeBody) -> Result<PixChargeRequest, Error> {
    let amount = body.amount.ok_or_else(|| missing_field_error("amount"))?;
    PixChargeRequest::try_new(&amount, body.description).map_err(|err| match err {
        PixValidationError::NonPositiveAmount => {
            invalid_field_error("amount", "non_positive_amount", err.to_string())
        }
        other => invalid_field_error("amount", "invalid_amount", other.to_string()),
    })
}

/// Create an immediate PIX charge.
#[utoipa::path(
    post,
    path = "/api/v1/pix/charges",
    request_body = PixChargeBody,
    responses(
        (status = 201, description = "Charge created", body = PixChargeResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 500, description = "PIX gateway failure", body = ErrorSchema)
    ),
    tags = ["pix"],
    operation_id = "createPixCharge"
)]
#[post("/pix/charges")]
pub async fn create_pix_charge(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<PixChargeBody>,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let request = parse_charge_body(payload.into_inner())?;
    let charge = state.pix_charges.create_charge(&user_id, request).await?;
    Ok(HttpResponse::Created().json(PixChargeResponse::from(charge)))
}
