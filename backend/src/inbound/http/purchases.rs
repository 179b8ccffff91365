//! Purchase entitlement handlers.
//!
//! ```text
//! GET  /api/v1/purchases
//! POST /api/v1/purchases/{id}/submission
//! POST /api/v1/purchases/{id}/consumption {"notificationId":"..."}
//! POST /api/v1/purchases/{id}/rejection
//! ```
//!
//! Consumption and rejection are moderator actions; role checks belong to
//! the auth provider, so here they only require a signed-in session.

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{NotificationId, Purchase, PurchaseId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{parse_optional_json, parse_uuid};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub id: String,
    #[serde(rename = "type")]
    #[schema(example = "PRODUCT_BOOST")]
    pub purchase_type: &'static str,
    #[schema(example = "AVAILABLE")]
    pub submission_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Purchase> for PurchaseResponse {
    fn from(purchase: Purchase) -> Self {
        Self {
            id: purchase.id.to_string(),
            purchase_type: purchase.purchase_type.as_str(),
            submission_status: purchase.submission_status.as_str(),
            product_id: purchase.product_id,
            created_at: purchase.created_at.to_rfc3339(),
            updated_at: purchase.updated_at.to_rfc3339(),
        }
    }
}

/// Optional body for `POST /api/v1/purchases/{id}/consumption`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionRequest {
    /// Usage-request notification to mark read alongside the transition.
    pub notification_id: Option<String>,
}

fn parse_purchase_id(raw: &str) -> Result<PurchaseId, crate::domain::Error> {
    parse_uuid(raw, "purchaseId").map(PurchaseId::from_uuid)
}

/// List the signed-in user's purchases, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    responses(
        (status = 200, description = "Purchases", body = [PurchaseResponse]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["purchases"],
    operation_id = "listPurchases"
)]
#[get("/purchases")]
pub async fn list_purchases(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<PurchaseResponse>>> {
    let owner_id = session.require_user_id()?;
    let purchases = state.purchases_query.list_purchases(&owner_id).await?;
    Ok(web::Json(purchases.into_iter().map(Into::into).collect()))
}

/// Ask to use an available purchase: `AVAILABLE -> PENDING_APPROVAL`.
#[utoipa::path(
    post,
    path = "/api/v1/purchases/{id}/submission",
    params(("id" = String, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Submitted for approval", body = PurchaseResponse),
        (status = 400, description = "Invalid purchase id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Purchase not found", body = ErrorSchema),
        (status = 409, description = "Purchase is not available", body = ErrorSchema)
    ),
    tags = ["purchases"],
    operation_id = "submitPurchase"
)]
#[post("/purchases/{id}/submission")]
pub async fn submit_purchase(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PurchaseResponse>> {
    let owner_id = session.require_user_id()?;
    let purchase_id = parse_purchase_id(&path)?;
    let purchase = state
        .purchases
        .submit_for_approval(&owner_id, purchase_id)
        .await?;
    Ok(web::Json(purchase.into()))
}

/// Approve usage: `PENDING_APPROVAL -> USED`.
#[utoipa::path(
    post,
    path = "/api/v1/purchases/{id}/consumption",
    params(("id" = String, Path, description = "Purchase id")),
    request_body(content = Option<ConsumptionRequest>, description = "Optional notification to mark read"),
    responses(
        (status = 200, description = "Purchase consumed", body = PurchaseResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Purchase not found", body = ErrorSchema),
        (status = 409, description = "Purchase is not pending approval", body = ErrorSchema)
    ),
    tags = ["purchases"],
    operation_id = "consumePurchase"
)]
#[post("/purchases/{id}/consumption")]
pub async fn consume_purchase(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    body: web::Bytes,
) -> ApiResult<web::Json<PurchaseResponse>> {
    session.require_user_id()?;
    let purchase_id = parse_purchase_id(&path)?;
    let request: ConsumptionRequest = parse_optional_json(&body)?.unwrap_or_default();
    let notification_id = request
        .notification_id
        .as_deref()
        .map(|raw| parse_uuid(raw, "notificationId").map(NotificationId::from_uuid))
        .transpose()?;
    let purchase = state.purchases.consume(purchase_id, notification_id).await?;
    Ok(web::Json(purchase.into()))
}

/// Decline usage: `PENDING_APPROVAL -> AVAILABLE`.
#[utoipa::path(
    post,
    path = "/api/v1/purchases/{id}/rejection",
    params(("id" = String, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase returned to available", body = PurchaseResponse),
        (status = 400, description = "Invalid purchase id", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Purchase not found", body = ErrorSchema),
        (status = 409, description = "Purchase is not pending approval", body = ErrorSchema)
    ),
    tags = ["purchases"],
    operation_id = "rejectPurchase"
)]
#[post("/purchases/{id}/rejection")]
pub async fn reject_purchase(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PurchaseResponse>> {
    session.require_user_id()?;
    let purchase_id = parse_purchase_id(&path)?;
    let purchase = state.purchases.reject(purchase_id).await?;
    Ok(web::Json(purchase.into()))
}
