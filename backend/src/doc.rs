//! OpenAPI documentation.
//!
//! [`ApiDoc`] registers every HTTP endpoint, the error schema wrappers from
//! `inbound::http::schemas`, and the session cookie security scheme. Swagger
//! UI serves it in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by the marketplace auth provider.",
            ))),
        );
    }
}

/// OpenAPI document for the payments service.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Marketplace payments API",
        description = "PIX and Stripe webhook reconciliation, hosted checkout and purchase entitlements."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::pix_webhook::receive_pix_webhook,
        crate::inbound::http::stripe_webhook::receive_stripe_webhook,
        crate::inbound::http::checkout::create_checkout_session,
        crate::inbound::http::payments::get_payment_status,
        crate::inbound::http::pix_charges::create_pix_charge,
        crate::inbound::http::purchases::list_purchases,
        crate::inbound::http::purchases::submit_purchase,
        crate::inbound::http::purchases::consume_purchase,
        crate::inbound::http::purchases::reject_purchase,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "webhooks", description = "Gateway callbacks"),
        (name = "checkout", description = "Hosted checkout sessions"),
        (name = "pix", description = "PIX charges and payment status"),
        (name = "purchases", description = "Promotion entitlements"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    #[rstest]
    #[case("/webhooks/pix")]
    #[case("/webhooks/stripe")]
    #[case("/api/v1/checkout/sessions")]
    #[case("/api/v1/pix/payments/{txid}")]
    #[case("/api/v1/pix/charges")]
    #[case("/api/v1/purchases")]
    #[case("/api/v1/purchases/{id}/consumption")]
    fn documents_endpoint(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    fn error_schema_has_code_and_message() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get("crate.domain.Error").expect("Error schema");
        match error_schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(obj.properties.contains_key("code"));
                assert!(obj.properties.contains_key("message"));
            }
            _ => panic!("expected Object schema"),
        }
    }
}
