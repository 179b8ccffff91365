//! PostgreSQL-backed payment accounts.
//!
//! Reads the payment projection of the `users` table and writes back the
//! processor customer id after (re)provisioning.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PaymentAccountRepository, PaymentAccountRepositoryError};
use crate::domain::{PaymentAccount, PaymentCustomerId, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::PaymentAccountRow;
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel implementation of [`PaymentAccountRepository`].
#[derive(Clone)]
pub struct DieselPaymentAccountRepository {
    pool: DbPool,
}

impl DieselPaymentAccountRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> PaymentAccountRepositoryError {
    map_pool_error(error, PaymentAccountRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> PaymentAccountRepositoryError {
    map_diesel_error(
        error,
        PaymentAccountRepositoryError::query,
        PaymentAccountRepositoryError::connection,
    )
}

fn row_to_account(row: PaymentAccountRow) -> PaymentAccount {
    // A blank cached id behaves like no id: the next checkout provisions one.
    let payment_customer_id = row
        .payment_customer_id
        .and_then(|id| PaymentCustomerId::new(id).ok());
    PaymentAccount {
        user_id: UserId::from_uuid(row.id),
        email: row.email,
        display_name: row.display_name,
        payment_customer_id,
    }
}

#[async_trait]
impl PaymentAccountRepository for DieselPaymentAccountRepository {
    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PaymentAccount>, PaymentAccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<PaymentAccountRow> = users::table
            .find(user_id.as_uuid())
            .select(PaymentAccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        Ok(row.map(row_to_account))
    }

    async fn store_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &PaymentCustomerId,
    ) -> Result<(), PaymentAccountRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let updated = diesel::update(users::table.find(user_id.as_uuid()))
            .set((
                users::payment_customer_id.eq(Some(customer_id.as_ref())),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;

        if updated == 0 {
            return Err(PaymentAccountRepositoryError::query(format!(
                "payment account {user_id} not found"
            )));
        }
        Ok(())
    }
}
