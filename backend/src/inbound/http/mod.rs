//! HTTP inbound adapter: webhook receivers and the session-authenticated API.

pub mod checkout;
pub mod error;
pub mod health;
pub mod payments;
pub mod pix_charges;
pub mod pix_webhook;
pub mod purchases;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
pub mod stripe_webhook;
#[cfg(test)]
pub mod test_utils;
mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register the session-authenticated API; mount under `/api/v1` behind the
/// session middleware.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(checkout::create_checkout_session)
        .service(payments::get_payment_status)
        .service(pix_charges::create_pix_charge)
        .service(purchases::list_purchases)
        .service(purchases::submit_purchase)
        .service(purchases::consume_purchase)
        .service(purchases::reject_purchase);
}

/// Register the gateway webhook receivers under `/webhooks`.
///
/// These routes authenticate by payload signature or network policy, never
/// by session cookie.
pub fn configure_webhooks(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhooks")
            .service(
                web::resource(["/pix", "/pix/pix"])
                    .route(web::post().to(pix_webhook::receive_pix_webhook)),
            )
            .service(stripe_webhook::receive_stripe_webhook),
    );
}
