//! Hosted checkout HTTP handler.
//!
//! ```text
//! POST /api/v1/checkout/sessions {"priceId":"price_123","productId":"p1","type":"payment"}
//! ```

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CheckoutRequest, CheckoutValidationError, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{invalid_field_error, missing_field_error};

/// Request body for `POST /api/v1/checkout/sessions`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    #[schema(example = "price_1PboostXYZ")]
    pub price_id: Option<String>,
    pub product_id: Option<String>,
    /// `payment` for one-time promotions, `subscription` otherwise.
    #[serde(rename = "type")]
    #[schema(example = "payment")]
    pub mode: Option<String>,
}

/// Hosted checkout page the browser should be redirected to.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub url: String,
}

fn map_checkout_validation_error(err: CheckoutValidationError) -> Error {
    let (field, code) = match err {
        CheckoutValidationError::EmptyPriceId => ("priceId", "empty_price_id"),
        CheckoutValidationError::InvalidMode => ("type", "invalid_mode"),
        CheckoutValidationError::BlankProductId => ("productId", "blank_product_id"),
    };
    invalid_field_error(field, code, err.to_string())
}

fn parse_checkout_request(payload: CheckoutSessionRequest) -> Result<CheckoutRequest, Error> {
    let price_id = payload.price_id.ok_or_else(|| missing_field_error("priceId"))?;
    let mode = payload.mode.ok_or_else(|| missing_field_error("type"))?;
    CheckoutRequest::try_new(price_id, payload.product_id, &mode)
        .map_err(map_checkout_validation_error)
}

/// Open a hosted checkout session for the signed-in user.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/sessions",
    request_body = CheckoutSessionRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutSessionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Account not found", body = ErrorSchema),
        (status = 500, description = "Payment provider or configuration failure", body = ErrorSchema)
    ),
    tags = ["checkout"],
    operation_id = "createCheckoutSession"
)]
#[post("/checkout/sessions")]
pub async fn create_checkout_session(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CheckoutSessionRequest>,
) -> ApiResult<web::Json<CheckoutSessionResponse>> {
    let user_id = session.require_user_id()?;
    let request = parse_checkout_request(payload.into_inner())?;
    let checkout = state
        .checkout
        .create_checkout_session(&user_id, request)
        .await?;
    Ok(web::Json(CheckoutSessionResponse { url: checkout.url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::{Value, json};

    use crate::domain::{CheckoutMode, CheckoutSession, ErrorCode};
    use crate::inbound::http::test_utils::{
        MockPorts, SESSION_USER_ID, session_cookie_for, session_login_route,
        test_session_middleware,
    };

    async fn call(ports: MockPorts, body: Value, signed_in: bool) -> (StatusCode, Value) {
        let app = actix_test::init_service(
            App::new()
                .app_data(ports.into_state())
                .wrap(test_session_middleware())
                .configure(session_login_route)
                .service(web::scope("/api/v1").configure(crate::inbound::http::configure_api)),
        )
        .await;
        let mut request = actix_test::TestRequest::post()
            .uri("/api/v1/checkout/sessions")
            .set_json(body);
        if signed_in {
            request = request.cookie(session_cookie_for(&app, SESSION_USER_ID).await);
        }
        let response = actix_test::call_service(&app, request.to_request()).await;
        let status = response.status();
        (status, actix_test::read_body_json(response).await)
    }

    #[actix_web::test]
    async fn returns_the_hosted_checkout_url() {
        let mut ports = MockPorts::default();
        ports
            .checkout
            .expect_create_checkout_session()
            .withf(|user_id, request| {
                user_id.as_ref() == SESSION_USER_ID
                    && request.mode == CheckoutMode::Payment
                    && request.product_id.as_deref() == Some("product-1")
            })
            .times(1)
            .return_once(|_, _| {
                Ok(CheckoutSession {
                    id: "cs_test_1".to_owned(),
                    url: "https://checkout.stripe.com/c/pay/cs_test_1".to_owned(),
                })
            });

        let (status, body) = call(
            ports,
            json!({"priceId": "price_boost", "productId": "product-1", "type": "payment"}),
            true,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_1");
    }

    #[actix_web::test]
    async fn requires_a_session() {
        let mut ports = MockPorts::default();
        ports.checkout.expect_create_checkout_session().times(0);

        let (status, _) = call(ports, json!({"priceId": "price_boost", "type": "payment"}), false).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[case(json!({"type": "payment"}), "priceId")]
    #[case(json!({"priceId": "", "type": "payment"}), "priceId")]
    #[case(json!({"priceId": "price_boost"}), "type")]
    #[case(json!({"priceId": "price_boost", "type": "donation"}), "type")]
    #[actix_web::test]
    async fn rejects_invalid_requests(#[case] body: Value, #[case] field: &str) {
        let mut ports = MockPorts::default();
        ports.checkout.expect_create_checkout_session().times(0);

        let (status, json) = call(ports, body, true).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"]["field"], field);
    }

    #[rstest]
    fn validation_errors_map_to_invalid_request() {
        let err = map_checkout_validation_error(CheckoutValidationError::BlankProductId);
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.details().expect("details")["field"], "productId");
    }
}
