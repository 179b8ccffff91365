//! Driving port for purchase lifecycle transitions.

use async_trait::async_trait;

use crate::domain::{Error, NotificationId, Purchase, PurchaseId, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseCommand: Send + Sync {
    /// Owner requests usage: `AVAILABLE -> PENDING_APPROVAL`.
    async fn submit_for_approval(
        &self,
        owner_id: &UserId,
        purchase_id: PurchaseId,
    ) -> Result<Purchase, Error>;

    /// Approve usage: `PENDING_APPROVAL -> USED`, marking the request
    /// notification read in the same transaction.
    async fn consume(
        &self,
        purchase_id: PurchaseId,
        notification_id: Option<NotificationId>,
    ) -> Result<Purchase, Error>;

    /// Decline usage: `PENDING_APPROVAL -> AVAILABLE`.
    async fn reject(&self, purchase_id: PurchaseId) -> Result<Purchase, Error>;
}
