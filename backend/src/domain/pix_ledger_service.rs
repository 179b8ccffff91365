//! PIX webhook ingestion and payment status lookups over the append-only ledger.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use super::ports::{
    NoOpWebhookMetrics, PixPaymentQuery, PixPaymentRepository, PixWebhookCommand, RecordOutcome,
    WebhookMetrics, WebhookOutcome, WebhookSource,
};
use super::service_support::map_ledger_error;
use super::{
    Error, PaymentStatus, PixBatch, PixNotification, PixPayment, PixWebhookReceipt, TransactionId,
};

/// Ledger service implementing the PIX webhook and status ports.
///
/// Each notification goes through the idempotency guard: an existence check,
/// then an insert that tolerates losing a race to a concurrent delivery. Only
/// the database unique constraint arbitrates between processes.
pub struct PixLedgerService<R, M = NoOpWebhookMetrics> {
    ledger: Arc<R>,
    metrics: Arc<M>,
    clock: Arc<dyn Clock>,
}

impl<R> PixLedgerService<R, NoOpWebhookMetrics> {
    /// Create a service that does not export metrics.
    pub fn with_noop_metrics(ledger: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self::new(ledger, Arc::new(NoOpWebhookMetrics), clock)
    }
}

impl<R, M> PixLedgerService<R, M> {
    /// Create a service exporting delivery outcomes through `metrics`.
    pub fn new(ledger: Arc<R>, metrics: Arc<M>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            metrics,
            clock,
        }
    }
}

impl<R, M> PixLedgerService<R, M>
where
    R: PixPaymentRepository,
    M: WebhookMetrics,
{
    async fn record_one(&self, notification: PixNotification) -> Result<RecordOutcome, Error> {
        let transaction_id = notification.transaction_id.clone();
        if self
            .ledger
            .exists(&transaction_id)
            .await
            .map_err(map_ledger_error)?
        {
            debug!(%transaction_id, "pix notification already recorded");
            return Ok(RecordOutcome::AlreadyExists);
        }

        let payment = PixPayment::completed(notification, self.clock.utc());
        let outcome = self
            .ledger
            .insert_if_absent(&payment)
            .await
            .map_err(map_ledger_error)?;
        match outcome {
            RecordOutcome::Inserted => info!(
                %transaction_id,
                amount = %payment.amount,
                "pix payment recorded"
            ),
            RecordOutcome::AlreadyExists => {
                debug!(%transaction_id, "pix notification recorded by a concurrent delivery");
            }
        }
        Ok(outcome)
    }

    async fn export(&self, outcome: WebhookOutcome, count: usize) {
        if count == 0 {
            return;
        }
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        if let Err(error) = self.metrics.record(WebhookSource::Pix, outcome, count).await {
            warn!(%error, "failed to record pix webhook metrics");
        }
    }
}

#[async_trait]
impl<R, M> PixWebhookCommand for PixLedgerService<R, M>
where
    R: PixPaymentRepository,
    M: WebhookMetrics,
{
    async fn ingest(&self, batch: PixBatch) -> Result<PixWebhookReceipt, Error> {
        let PixBatch {
            notifications,
            rejected,
        } = batch;
        let mut receipt = PixWebhookReceipt {
            received: notifications.len() + rejected,
            rejected,
            ..PixWebhookReceipt::default()
        };
        self.export(WebhookOutcome::Rejected, rejected).await;

        // Entries are applied in order; a storage failure leaves earlier
        // entries committed and the gateway redelivers the whole batch.
        for notification in notifications {
            match self.record_one(notification).await? {
                RecordOutcome::Inserted => receipt.recorded += 1,
                RecordOutcome::AlreadyExists => receipt.duplicates += 1,
            }
        }

        self.export(WebhookOutcome::Recorded, receipt.recorded).await;
        self.export(WebhookOutcome::Duplicate, receipt.duplicates).await;
        Ok(receipt)
    }
}

#[async_trait]
impl<R, M> PixPaymentQuery for PixLedgerService<R, M>
where
    R: PixPaymentRepository,
    M: WebhookMetrics,
{
    async fn payment_status(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<PaymentStatus, Error> {
        self.ledger
            .find(transaction_id)
            .await
            .map_err(map_ledger_error)?
            .map(|payment| payment.status)
            .ok_or_else(|| Error::not_found(format!("payment {transaction_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{
        MockPixPaymentRepository, MockWebhookMetrics, PixPaymentRepositoryError,
    };
    use crate::domain::service_support::test_clock::{fixture_clock, fixture_timestamp};
    use mockall::predicate::eq;
    use rstest::rstest;
    use serde_json::json;

    fn notification(txid: &str) -> PixNotification {
        PixNotification::try_from_parts(
            txid,
            "10.50",
            None,
            "2024-01-01T00:00:00Z",
            json!({"txid": txid, "valor": "10.50"}),
        )
        .expect("valid notification")
    }

    fn batch(txids: &[&str]) -> PixBatch {
        PixBatch {
            notifications: txids.iter().map(|txid| notification(txid)).collect(),
            rejected: 0,
        }
    }

    fn service(repo: MockPixPaymentRepository) -> PixLedgerService<MockPixPaymentRepository> {
        PixLedgerService::with_noop_metrics(Arc::new(repo), fixture_clock())
    }

    #[rstest]
    #[tokio::test]
    async fn records_unseen_transactions_as_completed() {
        let mut repo = MockPixPaymentRepository::new();
        repo.expect_exists().times(1).return_once(|_| Ok(false));
        repo.expect_insert_if_absent()
            .withf(|payment| {
                payment.transaction_id.as_ref() == "abc123"
                    && payment.status == PaymentStatus::Completed
                    && payment.amount.cents() == 1050
                    && payment.created_at == fixture_timestamp()
            })
            .times(1)
            .return_once(|_| Ok(RecordOutcome::Inserted));

        let receipt = service(repo)
            .ingest(batch(&["abc123"]))
            .await
            .expect("ingest succeeds");

        assert_eq!(
            receipt,
            PixWebhookReceipt {
                received: 1,
                recorded: 1,
                duplicates: 0,
                rejected: 0,
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn skips_transactions_already_in_the_ledger() {
        let mut repo = MockPixPaymentRepository::new();
        repo.expect_exists().times(1).return_once(|_| Ok(true));
        repo.expect_insert_if_absent().never();

        let receipt = service(repo)
            .ingest(batch(&["abc123"]))
            .await
            .expect("ingest succeeds");

        assert_eq!(receipt.recorded, 0);
        assert_eq!(receipt.duplicates, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn losing_an_insert_race_counts_as_duplicate() {
        let mut repo = MockPixPaymentRepository::new();
        repo.expect_exists().return_once(|_| Ok(false));
        repo.expect_insert_if_absent()
            .return_once(|_| Ok(RecordOutcome::AlreadyExists));

        let receipt = service(repo)
            .ingest(batch(&["abc123"]))
            .await
            .expect("ingest succeeds");

        assert_eq!(receipt.duplicates, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn storage_failure_fails_the_request() {
        let mut repo = MockPixPaymentRepository::new();
        repo.expect_exists()
            .return_once(|_| Err(PixPaymentRepositoryError::connection("refused")));

        let err = service(repo)
            .ingest(batch(&["abc123"]))
            .await
            .expect_err("storage failure must surface");

        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[rstest]
    #[tokio::test]
    async fn exports_recorded_and_duplicate_counts() {
        let mut repo = MockPixPaymentRepository::new();
        let mut seen = 0;
        repo.expect_exists().times(2).returning(move |_| {
            seen += 1;
            Ok(seen > 1)
        });
        repo.expect_insert_if_absent()
            .times(1)
            .return_once(|_| Ok(RecordOutcome::Inserted));

        let mut metrics = MockWebhookMetrics::new();
        metrics
            .expect_record()
            .with(eq(WebhookSource::Pix), eq(WebhookOutcome::Recorded), eq(1_u64))
            .times(1)
            .returning(|_, _, _| Ok(()));
        metrics
            .expect_record()
            .with(eq(WebhookSource::Pix), eq(WebhookOutcome::Duplicate), eq(1_u64))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = PixLedgerService::new(Arc::new(repo), Arc::new(metrics), fixture_clock());
        let receipt = service
            .ingest(batch(&["abc123", "abc123"]))
            .await
            .expect("ingest succeeds");

        assert_eq!(receipt.received, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn rejected_entries_are_counted_and_exported() {
        let mut repo = MockPixPaymentRepository::new();
        repo.expect_exists().times(1).return_once(|_| Ok(false));
        repo.expect_insert_if_absent()
            .times(1)
            .return_once(|_| Ok(RecordOutcome::Inserted));

        let mut metrics = MockWebhookMetrics::new();
        metrics
            .expect_record()
            .with(eq(WebhookSource::Pix), eq(WebhookOutcome::Rejected), eq(2_u64))
            .times(1)
            .returning(|_, _, _| Ok(()));
        metrics
            .expect_record()
            .with(eq(WebhookSource::Pix), eq(WebhookOutcome::Recorded), eq(1_u64))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = PixLedgerService::new(Arc::new(repo), Arc::new(metrics), fixture_clock());
        let receipt = service
            .ingest(PixBatch {
                rejected: 2,
                ..batch(&["good1"])
            })
            .await
            .expect("ingest succeeds");

        assert_eq!(
            receipt,
            PixWebhookReceipt {
                received: 3,
                recorded: 1,
                duplicates: 0,
                rejected: 2,
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn status_lookup_reports_missing_payments() {
        let mut repo = MockPixPaymentRepository::new();
        repo.expect_find().return_once(|_| Ok(None));

        let txid = TransactionId::new("missing1").expect("valid txid");
        let err = service(repo)
            .payment_status(&txid)
            .await
            .expect_err("missing payment");

        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn status_lookup_returns_recorded_status() {
        let mut repo = MockPixPaymentRepository::new();
        repo.expect_find().return_once(|_| {
            Ok(Some(PixPayment::completed(
                notification("abc123"),
                fixture_timestamp(),
            )))
        });

        let txid = TransactionId::new("abc123").expect("valid txid");
        let status = service(repo)
            .payment_status(&txid)
            .await
            .expect("status found");

        assert_eq!(status, PaymentStatus::Completed);
    }
}
