//! Domain ports.
//!
//! Driven ports (repositories, gateways, metrics) are implemented by outbound
//! adapters. Driving ports (commands and queries) are implemented by domain
//! services and consumed by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod checkout_command;
mod checkout_gateway;
mod payment_account_repository;
mod payment_event_command;
mod payment_event_verifier;
mod pix_charge_command;
mod pix_charge_gateway;
mod pix_payment_query;
mod pix_payment_repository;
mod pix_webhook_command;
mod purchase_command;
mod purchase_query;
mod purchase_repository;
mod webhook_metrics;

#[cfg(test)]
pub use checkout_command::MockCheckoutCommand;
pub use checkout_command::CheckoutCommand;
#[cfg(test)]
pub use checkout_gateway::MockCheckoutGateway;
pub use checkout_gateway::{CheckoutGateway, CheckoutGatewayError};
#[cfg(test)]
pub use payment_account_repository::MockPaymentAccountRepository;
pub use payment_account_repository::{PaymentAccountRepository, PaymentAccountRepositoryError};
#[cfg(test)]
pub use payment_event_command::MockPaymentEventCommand;
pub use payment_event_command::{PaymentEventCommand, PaymentEventOutcome};
#[cfg(test)]
pub use payment_event_verifier::MockPaymentEventVerifier;
pub use payment_event_verifier::{PaymentEventVerifier, PaymentEventVerifierError};
#[cfg(test)]
pub use pix_charge_command::MockPixChargeCommand;
pub use pix_charge_command::PixChargeCommand;
#[cfg(test)]
pub use pix_charge_gateway::MockPixChargeGateway;
pub use pix_charge_gateway::{PixChargeGateway, PixChargeGatewayError};
#[cfg(test)]
pub use pix_payment_query::MockPixPaymentQuery;
pub use pix_payment_query::PixPaymentQuery;
#[cfg(test)]
pub use pix_payment_repository::MockPixPaymentRepository;
pub use pix_payment_repository::{PixPaymentRepository, PixPaymentRepositoryError};
#[cfg(test)]
pub use pix_webhook_command::MockPixWebhookCommand;
pub use pix_webhook_command::PixWebhookCommand;
#[cfg(test)]
pub use purchase_command::MockPurchaseCommand;
pub use purchase_command::PurchaseCommand;
#[cfg(test)]
pub use purchase_query::MockPurchaseQuery;
pub use purchase_query::PurchaseQuery;
#[cfg(test)]
pub use purchase_repository::MockPurchaseRepository;
pub use purchase_repository::{
    PurchaseRepository, PurchaseRepositoryError, TransitionOutcome, TransitionRequest,
};
#[cfg(test)]
pub use webhook_metrics::MockWebhookMetrics;
pub use webhook_metrics::{
    NoOpWebhookMetrics, WebhookMetrics, WebhookMetricsError, WebhookOutcome, WebhookSource,
};

/// Result of an idempotent insert keyed by an external identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The row was written by this call.
    Inserted,
    /// A row with the same key already existed; nothing was written.
    AlreadyExists,
}
