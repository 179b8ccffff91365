//! Builds the port bundle handed to HTTP handlers.

use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use mockable::{Clock, DefaultClock};
use reqwest::Url;
use zeroize::Zeroizing;

use marketplace::domain::ports::WebhookMetrics;
use marketplace::domain::{
    CheckoutService, CheckoutUrls, PaymentEventService, PixChargeService, PixLedgerService,
    PriceCatalogue, PurchaseService,
};
use marketplace::inbound::http::state::HttpState;
use marketplace::outbound::persistence::{
    DbPool, DieselPaymentAccountRepository, DieselPixPaymentRepository, DieselPurchaseRepository,
};
use marketplace::outbound::pix::{PixGatewayConfig, PixHttpGateway};
use marketplace::outbound::stripe::{
    DEFAULT_STRIPE_API_BASE, StripeCheckoutGateway, StripeWebhookVerifier,
};
use marketplace::settings::MarketplaceSettings;

fn parse_url(raw: &str, setting: &str) -> Result<Url> {
    Url::parse(raw).wrap_err_with(|| format!("{setting} is not a valid URL"))
}

fn build_checkout_service(
    settings: &MarketplaceSettings,
    pool: &DbPool,
) -> Result<CheckoutService<DieselPaymentAccountRepository, StripeCheckoutGateway>> {
    let base = parse_url(
        settings
            .stripe_api_base
            .as_deref()
            .unwrap_or(DEFAULT_STRIPE_API_BASE),
        "stripe_api_base",
    )?;
    let gateway = StripeCheckoutGateway::new(
        base,
        Zeroizing::new(settings.stripe_secret_key()?.to_owned()),
        settings.http_timeout(),
    )
    .wrap_err("failed to build Stripe client")?;
    let urls = CheckoutUrls {
        success_url: settings.checkout_success_url()?.to_owned(),
        cancel_url: settings.checkout_cancel_url()?.to_owned(),
    };
    Ok(CheckoutService::new(
        Arc::new(DieselPaymentAccountRepository::new(pool.clone())),
        Arc::new(gateway),
        PriceCatalogue::new(
            settings.boost_price_id.clone(),
            settings.carousel_price_id.clone(),
        ),
        urls,
    ))
}

fn build_pix_charge_service(
    settings: &MarketplaceSettings,
    clock: Arc<dyn Clock>,
) -> Result<PixChargeService<PixHttpGateway>> {
    let config = PixGatewayConfig {
        base_url: parse_url(settings.pix_base_url()?, "pix_base_url")?,
        client_id: settings.pix_client_id()?.to_owned(),
        client_secret: Zeroizing::new(settings.pix_client_secret()?.to_owned()),
        pix_key: settings.pix_key()?.to_owned(),
        certificate_path: settings.pix_certificate_path()?.to_path_buf(),
        private_key_path: settings.pix_key_path()?.to_path_buf(),
        timeout: settings.http_timeout(),
    };
    let gateway = PixHttpGateway::new(config, clock).wrap_err("failed to build PIX client")?;
    Ok(PixChargeService::new(Arc::new(gateway)))
}

/// Wire Diesel repositories, gateway clients and domain services into the
/// handler state.
///
/// # Errors
///
/// Fails when a required setting is missing or a gateway client cannot be
/// constructed (bad URL, unreadable PEM files).
pub fn build_http_state<M>(
    settings: &MarketplaceSettings,
    pool: &DbPool,
    metrics: Arc<M>,
) -> Result<HttpState>
where
    M: WebhookMetrics + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let ledger = Arc::new(PixLedgerService::new(
        Arc::new(DieselPixPaymentRepository::new(pool.clone())),
        metrics.clone(),
        clock.clone(),
    ));
    let purchase_repo = Arc::new(DieselPurchaseRepository::new(pool.clone()));
    let purchases = Arc::new(PurchaseService::new(purchase_repo.clone(), clock.clone()));
    let verifier = StripeWebhookVerifier::new(
        Zeroizing::new(settings.stripe_webhook_secret()?.to_owned()),
        clock.clone(),
    )
    .with_tolerance(settings.stripe_signature_tolerance());
    let payment_events =
        PaymentEventService::new(Arc::new(verifier), purchase_repo, metrics, clock.clone());

    Ok(HttpState {
        pix_webhook: ledger.clone(),
        pix_payments: ledger,
        pix_charges: Arc::new(build_pix_charge_service(settings, clock)?),
        payment_events: Arc::new(payment_events),
        checkout: Arc::new(build_checkout_service(settings, pool)?),
        purchases: purchases.clone(),
        purchases_query: purchases,
    })
}
