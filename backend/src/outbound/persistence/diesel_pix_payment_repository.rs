//! PostgreSQL-backed PIX payment ledger.
//!
//! Rows are only ever inserted. The primary key on `transaction_id` is the
//! final arbiter of idempotency: `insert_if_absent` uses
//! `ON CONFLICT DO NOTHING`, so a delivery that races past the existence check
//! still resolves to [`RecordOutcome::AlreadyExists`].

use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{PixPaymentRepository, PixPaymentRepositoryError, RecordOutcome};
use crate::domain::{AmountCents, PaymentStatus, PixPayment, TransactionId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewPixPaymentRow, PixPaymentRow};
use super::pool::{DbPool, PoolError};
use super::schema::pix_payments;

/// Diesel implementation of [`PixPaymentRepository`].
#[derive(Clone)]
pub struct DieselPixPaymentRepository {
    pool: DbPool,
}

impl DieselPixPaymentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> PixPaymentRepositoryError {
    map_pool_error(error, PixPaymentRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> PixPaymentRepositoryError {
    map_diesel_error(
        error,
        PixPaymentRepositoryError::query,
        PixPaymentRepositoryError::connection,
    )
}

fn row_to_payment(row: PixPaymentRow) -> Result<PixPayment, PixPaymentRepositoryError> {
    let transaction_id = TransactionId::new(row.transaction_id).map_err(|err| {
        PixPaymentRepositoryError::query(format!("invalid transaction id in ledger: {err}"))
    })?;
    let status = PaymentStatus::from_str(&row.status).map_err(|err| {
        PixPaymentRepositoryError::query(format!("invalid payment status in ledger: {err}"))
    })?;

    Ok(PixPayment {
        transaction_id,
        amount: AmountCents::from_cents(row.amount_cents),
        end_to_end_id: row.end_to_end_id,
        paid_at: row.paid_at,
        status,
        raw_payload: row.raw_payload,
        created_at: row.created_at,
    })
}

#[async_trait]
impl PixPaymentRepository for DieselPixPaymentRepository {
    async fn exists(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<bool, PixPaymentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::select(diesel::dsl::exists(
            pix_payments::table.filter(pix_payments::transaction_id.eq(transaction_id.as_ref())),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(diesel_error)
    }

    async fn insert_if_absent(
        &self,
        payment: &PixPayment,
    ) -> Result<RecordOutcome, PixPaymentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = NewPixPaymentRow {
            transaction_id: payment.transaction_id.as_ref(),
            amount_cents: payment.amount.cents(),
            end_to_end_id: payment.end_to_end_id.as_deref(),
            paid_at: payment.paid_at,
            status: payment.status.as_str(),
            raw_payload: &payment.raw_payload,
            created_at: payment.created_at,
        };

        let rows_affected = diesel::insert_into(pix_payments::table)
            .values(&row)
            .on_conflict(pix_payments::transaction_id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;

        if rows_affected == 0 {
            debug!(transaction_id = %payment.transaction_id, "pix ledger insert skipped");
            return Ok(RecordOutcome::AlreadyExists);
        }
        Ok(RecordOutcome::Inserted)
    }

    async fn find(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PixPayment>, PixPaymentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<PixPaymentRow> = pix_payments::table
            .filter(pix_payments::transaction_id.eq(transaction_id.as_ref()))
            .select(PixPaymentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(row_to_payment).transpose()
    }
}
