//! Pre-paid promotion entitlements and their submission lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Errors raised when decoding purchase enums from storage or metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseValidationError {
    #[error("unknown purchase type: {0}")]
    UnknownType(String),
    #[error("unknown submission status: {0}")]
    UnknownStatus(String),
    #[error("purchase id must be a valid UUID")]
    InvalidId,
}

/// Identifier of a purchase entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(Uuid);

impl PurchaseId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for PurchaseId {
    type Err = PurchaseValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| PurchaseValidationError::InvalidId)
    }
}

impl fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the admin notification that announced a usage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

/// Kind of one-time promotion a purchase entitles its owner to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseType {
    ProductBoost,
    CarouselHighlight,
}

impl PurchaseType {
    /// Storage and metadata representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductBoost => "PRODUCT_BOOST",
            Self::CarouselHighlight => "CAROUSEL_HIGHLIGHT",
        }
    }
}

impl FromStr for PurchaseType {
    type Err = PurchaseValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRODUCT_BOOST" => Ok(Self::ProductBoost),
            "CAROUSEL_HIGHLIGHT" => Ok(Self::CarouselHighlight),
            other => Err(PurchaseValidationError::UnknownType(other.to_owned())),
        }
    }
}

/// Where a purchase sits in the usage approval flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Available,
    PendingApproval,
    Used,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Used => "USED",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = PurchaseValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "USED" => Ok(Self::Used),
            other => Err(PurchaseValidationError::UnknownStatus(other.to_owned())),
        }
    }
}

/// A guarded status change: applied only while the purchase is in `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTransition {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
}

impl SubmissionTransition {
    /// Owner asks for the promotion to be applied.
    pub const SUBMIT: Self = Self {
        from: SubmissionStatus::Available,
        to: SubmissionStatus::PendingApproval,
    };
    /// Admin approves the request and the entitlement is spent.
    pub const CONSUME: Self = Self {
        from: SubmissionStatus::PendingApproval,
        to: SubmissionStatus::Used,
    };
    /// Admin declines the request and the entitlement becomes usable again.
    pub const REJECT: Self = Self {
        from: SubmissionStatus::PendingApproval,
        to: SubmissionStatus::Available,
    };
}

/// Purchase entitlement record.
///
/// ## Invariants
/// - `checkout_session_id` is unique across purchases.
/// - `submission_status` only moves along [`SubmissionTransition`] edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub id: PurchaseId,
    pub purchase_type: PurchaseType,
    pub submission_status: SubmissionStatus,
    pub owner_id: UserId,
    pub product_id: Option<String>,
    pub checkout_session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// Build a fresh entitlement for a completed checkout.
    pub fn available(
        owner_id: UserId,
        purchase_type: PurchaseType,
        product_id: Option<String>,
        checkout_session_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PurchaseId::random(),
            purchase_type,
            submission_status: SubmissionStatus::Available,
            owner_id,
            product_id,
            checkout_session_id: checkout_session_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
