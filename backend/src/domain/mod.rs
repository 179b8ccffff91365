//! Domain primitives, ports and services for marketplace payments.
//!
//! Purpose: define strongly typed payment entities and the services that
//! reconcile gateway callbacks against them. Adapters live outside this
//! module and talk to it only through [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and its stable identifier.
//! - PIX types: [`TransactionId`], [`AmountCents`], [`PixNotification`],
//!   [`PixPayment`] and the charge request/response pair.
//! - Purchase types: [`Purchase`], [`PurchaseType`], [`SubmissionStatus`].
//! - Checkout types: [`CheckoutRequest`], [`PriceCatalogue`],
//!   [`PaymentEvent`].
//! - Services implementing the driving ports.

pub mod checkout;
mod checkout_service;
pub mod error;
mod payment_event_service;
pub mod pix;
mod pix_charge_service;
mod pix_ledger_service;
pub mod ports;
pub mod purchase;
mod purchase_service;
pub(crate) mod service_support;
pub mod trace_id;
pub mod user;

pub use self::checkout::{
    CheckoutCompletion, CheckoutMode, CheckoutRequest, CheckoutSession, CheckoutSessionDraft,
    CheckoutUrls, CheckoutValidationError, CustomerLookup, METADATA_PRODUCT_ID,
    METADATA_PURCHASE_TYPE, METADATA_USER_ID, NewCustomer, PaymentEvent, PriceCatalogue,
};
pub use self::checkout_service::CheckoutService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::payment_event_service::PaymentEventService;
pub use self::pix::{
    AmountCents, END_TO_END_ID_MAX, PaymentStatus, PixBatch, PixCharge, PixChargeRequest,
    PixNotification, PixPayment, PixValidationError, PixWebhookReceipt, TRANSACTION_ID_MAX,
    TransactionId,
};
pub use self::pix_charge_service::PixChargeService;
pub use self::pix_ledger_service::PixLedgerService;
pub use self::purchase::{
    NotificationId, Purchase, PurchaseId, PurchaseType, PurchaseValidationError,
    SubmissionStatus, SubmissionTransition,
};
pub use self::purchase_service::PurchaseService;
pub use self::trace_id::TraceId;
pub use self::user::{PaymentAccount, PaymentCustomerId, UserId, UserValidationError};

/// HTTP header name used to propagate trace identifiers.
pub const TRACE_ID_HEADER: &str = "trace-id";
