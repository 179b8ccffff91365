//! Stripe webhook receiver.
//!
//! ```text
//! POST /webhooks/stripe   Stripe-Signature: t=...,v1=...
//! ```
//!
//! The signature covers the exact request bytes, so the body is read raw and
//! handed to the domain untouched.

use actix_web::{HttpRequest, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::PaymentEventOutcome;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Acknowledgement returned to Stripe.
#[derive(Debug, Serialize, ToSchema)]
pub struct StripeWebhookResponse {
    pub received: bool,
    /// `created`, `duplicate` or `ignored`.
    #[schema(example = "created")]
    pub outcome: &'static str,
}

impl From<PaymentEventOutcome> for StripeWebhookResponse {
    fn from(outcome: PaymentEventOutcome) -> Self {
        let outcome = match outcome {
            PaymentEventOutcome::PurchaseCreated(_) => "created",
            PaymentEventOutcome::AlreadyProcessed => "duplicate",
            PaymentEventOutcome::Ignored => "ignored",
        };
        Self {
            received: true,
            outcome,
        }
    }
}

/// Receive a signed Stripe event.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "Stripe webhook signature header")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = StripeWebhookResponse),
        (status = 400, description = "Missing or invalid signature, or malformed event", body = ErrorSchema),
        (status = 500, description = "Purchase storage unavailable", body = ErrorSchema)
    ),
    tags = ["webhooks"],
    operation_id = "receiveStripeWebhook",
    security([])
)]
#[post("/stripe")]
pub async fn receive_stripe_webhook(
    state: web::Data<HttpState>,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<web::Json<StripeWebhookResponse>> {
    let signature = request
        .headers()
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::invalid_request("missing Stripe-Signature header"))?;

    let outcome = state.payment_events.handle_event(&body, signature).await?;
    Ok(web::Json(outcome.into()))
}
