//! Shared HTTP adapter state.
//!
//! Handlers receive this bundle through `web::Data` and depend only on the
//! driving ports, so they can be exercised with mocks and no I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CheckoutCommand, PaymentEventCommand, PixChargeCommand, PixPaymentQuery, PixWebhookCommand,
    PurchaseCommand, PurchaseQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub pix_webhook: Arc<dyn PixWebhookCommand>,
    pub pix_payments: Arc<dyn PixPaymentQuery>,
    pub pix_charges: Arc<dyn PixChargeCommand>,
    pub payment_events: Arc<dyn PaymentEventCommand>,
    pub checkout: Arc<dyn CheckoutCommand>,
    pub purchases: Arc<dyn PurchaseCommand>,
    pub purchases_query: Arc<dyn PurchaseQuery>,
}
