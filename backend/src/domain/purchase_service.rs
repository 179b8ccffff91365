//! Purchase entitlement lifecycle: listing, usage submission, approval.
//!
//! Every transition is a compare-and-set executed by the repository, so two
//! concurrent requests for the same purchase cannot both succeed. When the
//! guard rejects a change, the purchase is re-read only to choose between
//! "not found" and "conflict" for the caller.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::ports::{
    PurchaseCommand, PurchaseQuery, PurchaseRepository, TransitionOutcome, TransitionRequest,
};
use super::service_support::map_purchase_error;
use super::{Error, NotificationId, Purchase, PurchaseId, SubmissionTransition, UserId};

/// Service implementing [`PurchaseCommand`] and [`PurchaseQuery`].
pub struct PurchaseService<P> {
    purchases: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<P> PurchaseService<P> {
    /// Create a service over the purchase repository.
    pub fn new(purchases: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self { purchases, clock }
    }
}

impl<P> PurchaseService<P>
where
    P: PurchaseRepository,
{
    async fn transition(
        &self,
        purchase_id: PurchaseId,
        owner_id: Option<&UserId>,
        transition: SubmissionTransition,
        notification_id: Option<NotificationId>,
    ) -> Result<Purchase, Error> {
        let request = TransitionRequest {
            purchase_id,
            owner_id: owner_id.cloned(),
            transition,
            notification_id,
            at: self.clock.utc(),
        };

        match self
            .purchases
            .apply_transition(&request)
            .await
            .map_err(map_purchase_error)?
        {
            TransitionOutcome::Applied(purchase) => {
                info!(
                    %purchase_id,
                    from = transition.from.as_str(),
                    to = transition.to.as_str(),
                    "purchase transitioned"
                );
                Ok(purchase)
            }
            TransitionOutcome::NotApplied => {
                Err(self.explain_rejection(purchase_id, owner_id, transition).await)
            }
        }
    }

    async fn explain_rejection(
        &self,
        purchase_id: PurchaseId,
        owner_id: Option<&UserId>,
        transition: SubmissionTransition,
    ) -> Error {
        let current = match self.purchases.find_by_id(&purchase_id).await {
            Ok(current) => current,
            Err(err) => return map_purchase_error(err),
        };

        match current {
            Some(purchase) if owner_id.is_none_or(|owner| *owner == purchase.owner_id) => {
                Error::conflict(format!(
                    "purchase is {} and cannot move to {}",
                    purchase.submission_status.as_str(),
                    transition.to.as_str()
                ))
                .with_details(json!({
                    "status": purchase.submission_status.as_str(),
                    "expected": transition.from.as_str(),
                }))
            }
            // Purchases owned by someone else are reported as missing.
            _ => Error::not_found(format!("purchase {purchase_id} not found")),
        }
    }
}

#[async_trait]
impl<P> PurchaseCommand for PurchaseService<P>
where
    P: PurchaseRepository,
{
    async fn submit_for_approval(
        &self,
        owner_id: &UserId,
        purchase_id: PurchaseId,
    ) -> Result<Purchase, Error> {
        self.transition(purchase_id, Some(owner_id), SubmissionTransition::SUBMIT, None)
            .await
    }

    async fn consume(
        &self,
        purchase_id: PurchaseId,
        notification_id: Option<NotificationId>,
    ) -> Result<Purchase, Error> {
        self.transition(purchase_id, None, SubmissionTransition::CONSUME, notification_id)
            .await
    }

    async fn reject(&self, purchase_id: PurchaseId) -> Result<Purchase, Error> {
        self.transition(purchase_id, None, SubmissionTransition::REJECT, None)
            .await
    }
}

#[async_trait]
impl<P> PurchaseQuery for PurchaseService<P>
where
    P: PurchaseRepository,
{
    async fn list_purchases(&self, owner_id: &UserId) -> Result<Vec<Purchase>, Error> {
        self.purchases
            .list_for_owner(owner_id)
            .await
            .map_err(map_purchase_error)
    }
}
