//! Fixture writers for database-backed integration tests.
//!
//! Only compiled with the `test-support` feature.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::{NotificationId, PaymentAccount, PurchaseId, UserId};

use super::models::{NewNotificationRow, NewUserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{notifications, users};

/// Errors raised while seeding fixtures.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
}

/// Insert a user row carrying the account's payment fields.
pub async fn insert_account(pool: &DbPool, account: &PaymentAccount) -> Result<(), SeedError> {
    let mut conn = pool.get().await?;
    diesel::insert_into(users::table)
        .values(&NewUserRow {
            id: *account.user_id.as_uuid(),
            email: &account.email,
            display_name: &account.display_name,
            payment_customer_id: account.payment_customer_id.as_ref().map(AsRef::as_ref),
        })
        .execute(&mut conn)
        .await?;
    Ok(())
}

/// Insert an unread notification addressed to `recipient`.
pub async fn insert_notification(
    pool: &DbPool,
    recipient: &UserId,
    purchase: Option<PurchaseId>,
) -> Result<NotificationId, SeedError> {
    let id = uuid::Uuid::new_v4();
    let mut conn = pool.get().await?;
    diesel::insert_into(notifications::table)
        .values(&NewNotificationRow {
            id,
            recipient_id: *recipient.as_uuid(),
            purchase_id: purchase.map(|p| *p.as_uuid()),
        })
        .execute(&mut conn)
        .await?;
    Ok(NotificationId::from_uuid(id))
}

/// Read back when a notification was marked read.
pub async fn notification_read_at(
    pool: &DbPool,
    id: NotificationId,
) -> Result<Option<DateTime<Utc>>, SeedError> {
    let mut conn = pool.get().await?;
    let read_at = notifications::table
        .find(id.as_uuid())
        .select(notifications::read_at)
        .first::<Option<DateTime<Utc>>>(&mut conn)
        .await?;
    Ok(read_at)
}
