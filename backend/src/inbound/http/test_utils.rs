//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{HttpResponse, test, web};

use crate::domain::UserId;
use crate::domain::ports::{
    MockCheckoutCommand, MockPaymentEventCommand, MockPixChargeCommand, MockPixPaymentQuery,
    MockPixWebhookCommand, MockPurchaseCommand, MockPurchaseQuery,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

pub const SESSION_USER_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Cookie session middleware with a fresh key and `Secure` disabled.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Register `GET /test/session/{user_id}`, which signs the given user in.
///
/// Stands in for the external auth provider.
pub fn session_login_route(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/test/session/{user_id}",
        web::get().to(
            |session: SessionContext, path: web::Path<String>| async move {
                let user_id = UserId::new(path.into_inner())
                    .map_err(|err| crate::domain::Error::invalid_request(err.to_string()))?;
                session.persist_user(&user_id)?;
                Ok::<_, crate::domain::Error>(HttpResponse::NoContent().finish())
            },
        ),
    );
}

/// Sign `user_id` in and return the resulting session cookie.
pub async fn session_cookie_for<S>(app: &S, user_id: &str) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let request = test::TestRequest::get()
        .uri(&format!("/test/session/{user_id}"))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "test sign-in failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

/// Mock driving ports; configure the ones a test touches, then build state.
#[derive(Default)]
pub struct MockPorts {
    pub pix_webhook: MockPixWebhookCommand,
    pub pix_payments: MockPixPaymentQuery,
    pub pix_charges: MockPixChargeCommand,
    pub payment_events: MockPaymentEventCommand,
    pub checkout: MockCheckoutCommand,
    pub purchases: MockPurchaseCommand,
    pub purchases_query: MockPurchaseQuery,
}

impl MockPorts {
    pub fn into_state(self) -> web::Data<HttpState> {
        web::Data::new(HttpState {
            pix_webhook: Arc::new(self.pix_webhook),
            pix_payments: Arc::new(self.pix_payments),
            pix_charges: Arc::new(self.pix_charges),
            payment_events: Arc::new(self.payment_events),
            checkout: Arc::new(self.checkout),
            purchases: Arc::new(self.purchases),
            purchases_query: Arc::new(self.purchases_query),
        })
    }
}
