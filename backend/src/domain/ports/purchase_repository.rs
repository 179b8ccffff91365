//! Port abstraction for purchase entitlements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{NotificationId, Purchase, PurchaseId, SubmissionTransition, UserId};

use super::{RecordOutcome, define_port_error};

define_port_error! {
    /// Errors raised by purchase repository adapters.
    pub enum PurchaseRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "purchase repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "purchase repository query failed: {message}",
        /// The purchase names an owner with no user record.
        UnknownOwner { owner_id: String } => "purchase owner {owner_id} does not exist",
    }
}

/// A compare-and-set status change on one purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub purchase_id: PurchaseId,
    /// Restrict the change to purchases owned by this user.
    pub owner_id: Option<UserId>,
    pub transition: SubmissionTransition,
    /// Notification to mark read in the same transaction.
    pub notification_id: Option<NotificationId>,
    pub at: DateTime<Utc>,
}

/// Result of a guarded status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The purchase was in the expected state and now holds the new one.
    Applied(Purchase),
    /// No purchase matched the id, owner, and expected state.
    NotApplied,
}

/// Storage port for purchase entitlements.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Load the purchase created for a checkout session, if any.
    async fn find_by_checkout_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Purchase>, PurchaseRepositoryError>;

    /// Insert the purchase unless one exists for its checkout session.
    ///
    /// Fails with `UnknownOwner` when the owner has no user record.
    async fn insert_if_absent(
        &self,
        purchase: &Purchase,
    ) -> Result<RecordOutcome, PurchaseRepositoryError>;

    /// Load a purchase by id.
    async fn find_by_id(&self, id: &PurchaseId)
    -> Result<Option<Purchase>, PurchaseRepositoryError>;

    /// List an owner's purchases, newest first.
    async fn list_for_owner(&self, owner_id: &UserId)
    -> Result<Vec<Purchase>, PurchaseRepositoryError>;

    /// Apply a status change only if the purchase is still in `transition.from`.
    ///
    /// The status update and the optional notification update commit together
    /// or not at all.
    async fn apply_transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, PurchaseRepositoryError>;
}
