//! Checkout requests, the price catalogue, and processor events.

use std::collections::HashMap;
use std::str::FromStr;

use super::{PaymentAccount, PaymentCustomerId, PurchaseType};

/// Metadata key carrying the local user id on a checkout session.
pub const METADATA_USER_ID: &str = "userId";
/// Metadata key carrying the optional product id on a checkout session.
pub const METADATA_PRODUCT_ID: &str = "productId";
/// Metadata key carrying the purchase type on a payment-mode session.
pub const METADATA_PURCHASE_TYPE: &str = "purchaseType";

/// Validation errors for checkout input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutValidationError {
    #[error("priceId must not be empty")]
    EmptyPriceId,
    #[error("type must be \"subscription\" or \"payment\"")]
    InvalidMode,
    #[error("productId must not be blank when present")]
    BlankProductId,
}

/// Billing mode of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Subscription,
    Payment,
}

impl CheckoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Payment => "payment",
        }
    }
}

impl FromStr for CheckoutMode {
    type Err = CheckoutValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(Self::Subscription),
            "payment" => Ok(Self::Payment),
            _ => Err(CheckoutValidationError::InvalidMode),
        }
    }
}

/// Validated checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub product_id: Option<String>,
    pub mode: CheckoutMode,
}

impl CheckoutRequest {
    /// Validate the wire fields of a checkout request.
    ///
    /// # Examples
    /// ```
    /// use marketplace::domain::{CheckoutMode, CheckoutRequest};
    ///
    /// let request = CheckoutRequest::try_new("price_boost", None, "payment").expect("valid");
    /// assert_eq!(request.mode, CheckoutMode::Payment);
    /// assert!(CheckoutRequest::try_new(" ", None, "payment").is_err());
    /// ```
    pub fn try_new(
        price_id: impl Into<String>,
        product_id: Option<String>,
        mode: &str,
    ) -> Result<Self, CheckoutValidationError> {
        let price_id = price_id.into();
        if price_id.trim().is_empty() {
            return Err(CheckoutValidationError::EmptyPriceId);
        }
        if product_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(CheckoutValidationError::BlankProductId);
        }
        let mode = mode.parse()?;
        Ok(Self {
            price_id,
            product_id,
            mode,
        })
    }
}

/// Configured mapping from processor price ids to purchase types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceCatalogue {
    prices: HashMap<String, PurchaseType>,
}

impl PriceCatalogue {
    /// Build a catalogue from the optional configured price ids.
    pub fn new(boost_price_id: Option<String>, carousel_price_id: Option<String>) -> Self {
        let prices = [
            (boost_price_id, PurchaseType::ProductBoost),
            (carousel_price_id, PurchaseType::CarouselHighlight),
        ]
        .into_iter()
        .filter_map(|(price, kind)| price.filter(|id| !id.trim().is_empty()).map(|id| (id, kind)))
        .collect();
        Self { prices }
    }

    /// Resolve the purchase type sold under `price_id`.
    pub fn resolve(&self, price_id: &str) -> Option<PurchaseType> {
        self.prices.get(price_id).copied()
    }
}

/// Redirect targets for the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

/// Everything the processor needs to open a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionDraft {
    pub customer_id: PaymentCustomerId,
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    /// Attribution read back by the completion webhook.
    pub metadata: Vec<(&'static str, String)>,
}

/// Hosted checkout session returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Result of re-verifying a cached processor customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerLookup {
    /// The processor still knows the customer.
    Active,
    /// The processor reports the customer missing or deleted.
    Gone,
}

/// Request to provision a processor customer for a local account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    pub user_id: String,
}

impl From<&PaymentAccount> for NewCustomer {
    fn from(account: &PaymentAccount) -> Self {
        Self {
            email: account.email.clone(),
            name: account.display_name.clone(),
            user_id: account.user_id.to_string(),
        }
    }
}

/// Payment processor webhook event after signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// A hosted checkout session finished.
    CheckoutCompleted(CheckoutCompletion),
    /// Any event this service does not act on.
    Ignored { event_type: String },
}

/// Fields of a completed checkout session relevant to entitlements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompletion {
    pub session_id: String,
    pub mode: String,
    pub payment_status: String,
    pub metadata: HashMap<String, String>,
}

impl CheckoutCompletion {
    /// True for one-off payments that have been captured.
    pub fn is_paid_payment(&self) -> bool {
        self.mode == CheckoutMode::Payment.as_str() && self.payment_status == "paid"
    }
}
