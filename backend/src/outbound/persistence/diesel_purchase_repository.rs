//! PostgreSQL-backed purchase entitlements.
//!
//! Lifecycle transitions are a single conditional
//! `UPDATE … WHERE id = $1 AND submission_status = $expected RETURNING *`
//! executed in a transaction together with the notification side effect.
//! Zero returned rows means another request got there first, or the purchase
//! is in a different state; either way nothing is written.

use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{
    PurchaseRepository, PurchaseRepositoryError, RecordOutcome, TransitionOutcome,
    TransitionRequest,
};
use crate::domain::{Purchase, PurchaseId, PurchaseType, SubmissionStatus, UserId};

use super::diesel_error_mapping::{is_foreign_key_violation, map_diesel_error, map_pool_error};
use super::models::{NewPurchaseRow, PurchaseRow};
use super::pool::{DbPool, PoolError};
use super::schema::{notifications, purchases};

/// Diesel implementation of [`PurchaseRepository`].
#[derive(Clone)]
pub struct DieselPurchaseRepository {
    pool: DbPool,
}

impl DieselPurchaseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> PurchaseRepositoryError {
    map_pool_error(error, PurchaseRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> PurchaseRepositoryError {
    map_diesel_error(
        error,
        PurchaseRepositoryError::query,
        PurchaseRepositoryError::connection,
    )
}

fn row_to_purchase(row: PurchaseRow) -> Result<Purchase, PurchaseRepositoryError> {
    let purchase_type = PurchaseType::from_str(&row.purchase_type).map_err(|err| {
        PurchaseRepositoryError::query(format!("invalid purchase type in database: {err}"))
    })?;
    let submission_status = SubmissionStatus::from_str(&row.submission_status).map_err(|err| {
        PurchaseRepositoryError::query(format!("invalid submission status in database: {err}"))
    })?;

    Ok(Purchase {
        id: PurchaseId::from_uuid(row.id),
        purchase_type,
        submission_status,
        owner_id: UserId::from_uuid(row.owner_id),
        product_id: row.product_id,
        checkout_session_id: row.checkout_session_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl PurchaseRepository for DieselPurchaseRepository {
    async fn find_by_checkout_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Purchase>, PurchaseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<PurchaseRow> = purchases::table
            .filter(purchases::checkout_session_id.eq(checkout_session_id))
            .select(PurchaseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(row_to_purchase).transpose()
    }

    async fn insert_if_absent(
        &self,
        purchase: &Purchase,
    ) -> Result<RecordOutcome, PurchaseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = NewPurchaseRow {
            id: *purchase.id.as_uuid(),
            purchase_type: purchase.purchase_type.as_str(),
            submission_status: purchase.submission_status.as_str(),
            owner_id: *purchase.owner_id.as_uuid(),
            product_id: purchase.product_id.as_deref(),
            checkout_session_id: &purchase.checkout_session_id,
            created_at: purchase.created_at,
            updated_at: purchase.updated_at,
        };

        let rows_affected = diesel::insert_into(purchases::table)
            .values(&row)
            .on_conflict(purchases::checkout_session_id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(|error| {
                if is_foreign_key_violation(&error) {
                    PurchaseRepositoryError::unknown_owner(purchase.owner_id.to_string())
                } else {
                    diesel_error(error)
                }
            })?;

        if rows_affected == 0 {
            debug!(
                checkout_session_id = %purchase.checkout_session_id,
                "purchase insert skipped"
            );
            return Ok(RecordOutcome::AlreadyExists);
        }
        Ok(RecordOutcome::Inserted)
    }

    async fn find_by_id(&self, id: &PurchaseId) -> Result<Option<Purchase>, PurchaseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<PurchaseRow> = purchases::table
            .find(id.as_uuid())
            .select(PurchaseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(row_to_purchase).transpose()
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<Purchase>, PurchaseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows: Vec<PurchaseRow> = purchases::table
            .filter(purchases::owner_id.eq(owner_id.as_uuid()))
            .order((purchases::created_at.desc(), purchases::id.asc()))
            .select(PurchaseRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        rows.into_iter().map(row_to_purchase).collect()
    }

    async fn apply_transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, PurchaseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let purchase_id = *request.purchase_id.as_uuid();
        let owner_id = request.owner_id.as_ref().map(|owner| *owner.as_uuid());
        let notification_id = request.notification_id.map(|id| *id.as_uuid());
        let expected = request.transition.from.as_str();
        let next = request.transition.to.as_str();
        let at = request.at;

        let updated: Option<PurchaseRow> = conn
            .transaction(|conn| {
                async move {
                    let guarded = purchases::table
                        .filter(purchases::id.eq(purchase_id))
                        .filter(purchases::submission_status.eq(expected));
                    let changes = (
                        purchases::submission_status.eq(next),
                        purchases::updated_at.eq(at),
                    );

                    let row = match owner_id {
                        Some(owner) => {
                            diesel::update(guarded.filter(purchases::owner_id.eq(owner)))
                                .set(changes)
                                .returning(PurchaseRow::as_returning())
                                .get_result(conn)
                                .await
                                .optional()?
                        }
                        None => {
                            diesel::update(guarded)
                                .set(changes)
                                .returning(PurchaseRow::as_returning())
                                .get_result(conn)
                                .await
                                .optional()?
                        }
                    };

                    if let (Some(_), Some(notification)) = (&row, notification_id) {
                        diesel::update(
                            notifications::table
                                .filter(notifications::id.eq(notification))
                                .filter(notifications::read_at.is_null()),
                        )
                        .set(notifications::read_at.eq(at))
                        .execute(conn)
                        .await?;
                    }

                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        match updated {
            Some(row) => Ok(TransitionOutcome::Applied(row_to_purchase(row)?)),
            None => {
                debug!(%purchase_id, expected, "purchase transition guard rejected update");
                Ok(TransitionOutcome::NotApplied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    #[fixture]
    fn row() -> PurchaseRow {
        let now = Utc::now();
        PurchaseRow {
            id: Uuid::new_v4(),
            purchase_type: "CAROUSEL_HIGHLIGHT".to_owned(),
            submission_status: "PENDING_APPROVAL".to_owned(),
            owner_id: Uuid::new_v4(),
            product_id: Some("prod-42".to_owned()),
            checkout_session_id: "cs_test_42".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    fn converts_stored_rows(row: PurchaseRow) {
        let purchase = row_to_purchase(row).expect("valid row");
        assert_eq!(purchase.purchase_type, PurchaseType::CarouselHighlight);
        assert_eq!(purchase.submission_status, SubmissionStatus::PendingApproval);
        assert_eq!(purchase.product_id.as_deref(), Some("prod-42"));
    }

    #[rstest]
    #[case::unknown_type("PRODUCT_BOOST_PLUS", "AVAILABLE")]
    #[case::unknown_status("PRODUCT_BOOST", "ARCHIVED")]
    fn rejects_corrupt_rows(mut row: PurchaseRow, #[case] kind: &str, #[case] status: &str) {
        row.purchase_type = kind.to_owned();
        row.submission_status = status.to_owned();
        let err = row_to_purchase(row).expect_err("corrupt row");
        assert!(matches!(err, PurchaseRepositoryError::Query { .. }));
    }
}
