//! Shared harness wiring the real domain services to in-memory adapters.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use actix_web::{HttpResponse, web};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use marketplace::domain::{
    CheckoutService, CheckoutUrls, PaymentAccount, PaymentEventService, PixChargeService,
    PixLedgerService, PriceCatalogue, PurchaseService, UserId,
};
use marketplace::inbound::http::session::SessionContext;
use marketplace::inbound::http::state::HttpState;
use marketplace::outbound::stripe::StripeWebhookVerifier;
use marketplace::test_support::{
    AcceptingPixGateway, FakeCheckoutGateway, InMemoryPaymentAccounts, InMemoryPixLedger,
    InMemoryPurchaseStore, MutableClock,
};

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const BOOST_PRICE: &str = "price_boost";
pub const CAROUSEL_PRICE: &str = "price_carousel";
pub const USER_ID: &str = "6c1c1b9e-3a52-4f43-9d2f-6a3b8e9c0d11";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub fn user_id() -> UserId {
    UserId::new(USER_ID).expect("fixture user id")
}

/// In-memory adapters plus the port bundle built on top of them.
pub struct Harness {
    pub clock: Arc<MutableClock>,
    pub ledger: Arc<InMemoryPixLedger>,
    pub purchases: Arc<InMemoryPurchaseStore>,
    pub accounts: Arc<InMemoryPaymentAccounts>,
    pub gateway: Arc<FakeCheckoutGateway>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gateway(FakeCheckoutGateway::default())
    }

    pub fn with_gateway(gateway: FakeCheckoutGateway) -> Self {
        Self {
            clock: Arc::new(MutableClock::new(start_time())),
            ledger: Arc::new(InMemoryPixLedger::default()),
            purchases: Arc::new(InMemoryPurchaseStore::default()),
            accounts: Arc::new(InMemoryPaymentAccounts::default()),
            gateway: Arc::new(gateway),
        }
    }

    pub fn seed_account(&self, customer_id: Option<&str>) {
        let account = PaymentAccount {
            user_id: user_id(),
            email: "seller@example.com".to_owned(),
            display_name: "Seller".to_owned(),
            payment_customer_id: None,
        };
        let account = match customer_id {
            Some(id) => account.with_customer(
                marketplace::domain::PaymentCustomerId::new(id).expect("fixture customer id"),
            ),
            None => account,
        };
        self.accounts.insert(account);
    }

    pub fn checkout_service(&self) -> CheckoutService<InMemoryPaymentAccounts, FakeCheckoutGateway> {
        CheckoutService::new(
            self.accounts.clone(),
            self.gateway.clone(),
            PriceCatalogue::new(Some(BOOST_PRICE.to_owned()), Some(CAROUSEL_PRICE.to_owned())),
            CheckoutUrls {
                success_url: "https://shop.test/success".to_owned(),
                cancel_url: "https://shop.test/cancel".to_owned(),
            },
        )
    }

    pub fn purchase_service(&self) -> PurchaseService<InMemoryPurchaseStore> {
        PurchaseService::new(self.purchases.clone(), self.clock.clone())
    }

    pub fn pix_ledger_service(&self) -> PixLedgerService<InMemoryPixLedger> {
        PixLedgerService::with_noop_metrics(self.ledger.clone(), self.clock.clone())
    }

    pub fn http_state(&self) -> web::Data<HttpState> {
        let ledger = Arc::new(self.pix_ledger_service());
        let purchases = Arc::new(self.purchase_service());
        let verifier = StripeWebhookVerifier::new(
            Zeroizing::new(WEBHOOK_SECRET.to_owned()),
            self.clock.clone(),
        );
        let payment_events = PaymentEventService::with_noop_metrics(
            Arc::new(verifier),
            self.purchases.clone(),
            self.clock.clone(),
        );
        web::Data::new(HttpState {
            pix_webhook: ledger.clone(),
            pix_payments: ledger,
            pix_charges: Arc::new(PixChargeService::new(Arc::new(AcceptingPixGateway))),
            payment_events: Arc::new(payment_events),
            checkout: Arc::new(self.checkout_service()),
            purchases: purchases.clone(),
            purchases_query: purchases,
        })
    }
}

/// Build a `Stripe-Signature` header value for `payload` signed now.
pub fn stripe_signature(timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).expect("hmac accepts any key");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".into())
        .cookie_secure(false)
        .build()
}

/// Stand-in for the auth provider: writes the fixture user into the session.
pub async fn sign_in(session: SessionContext) -> actix_web::Result<HttpResponse> {
    session.persist_user(&user_id())?;
    Ok(HttpResponse::Ok().finish())
}
