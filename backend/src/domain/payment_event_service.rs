//! Turns verified checkout completions into purchase entitlements.
//!
//! Deliveries are at-least-once, so a checkout session id maps to at most one
//! purchase. Events that cannot be attributed are acknowledged and logged;
//! refusing them would only trigger redelivery of the same bad payload.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use super::ports::{
    NoOpWebhookMetrics, PaymentEventCommand, PaymentEventOutcome, PaymentEventVerifier,
    PaymentEventVerifierError, PurchaseRepository, PurchaseRepositoryError, RecordOutcome,
    WebhookMetrics, WebhookOutcome, WebhookSource,
};
use super::service_support::map_purchase_error;
use super::{
    CheckoutCompletion, Error, METADATA_PRODUCT_ID, METADATA_PURCHASE_TYPE, METADATA_USER_ID,
    PaymentEvent, Purchase, PurchaseType, UserId,
};

/// Service implementing [`PaymentEventCommand`].
pub struct PaymentEventService<V, P, M = NoOpWebhookMetrics> {
    verifier: Arc<V>,
    purchases: Arc<P>,
    metrics: Arc<M>,
    clock: Arc<dyn Clock>,
}

impl<V, P> PaymentEventService<V, P, NoOpWebhookMetrics> {
    /// Create a service that does not export metrics.
    pub fn with_noop_metrics(verifier: Arc<V>, purchases: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self::new(verifier, purchases, Arc::new(NoOpWebhookMetrics), clock)
    }
}

impl<V, P, M> PaymentEventService<V, P, M> {
    /// Create a service exporting delivery outcomes through `metrics`.
    pub fn new(verifier: Arc<V>, purchases: Arc<P>, metrics: Arc<M>, clock: Arc<dyn Clock>) -> Self {
        Self {
            verifier,
            purchases,
            metrics,
            clock,
        }
    }
}

struct Attribution {
    owner_id: UserId,
    purchase_type: PurchaseType,
    product_id: Option<String>,
}

fn read_attribution(completion: &CheckoutCompletion) -> Result<Attribution, String> {
    let field = |key: &str| {
        completion
            .metadata
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    };

    let owner_id = field(METADATA_USER_ID)
        .ok_or_else(|| format!("missing {METADATA_USER_ID}"))
        .and_then(|raw| UserId::new(raw).map_err(|err| err.to_string()))?;
    let purchase_type = field(METADATA_PURCHASE_TYPE)
        .ok_or_else(|| format!("missing {METADATA_PURCHASE_TYPE}"))
        .and_then(|raw| raw.parse::<PurchaseType>().map_err(|err| err.to_string()))?;
    let product_id = field(METADATA_PRODUCT_ID).map(str::to_owned);

    Ok(Attribution {
        owner_id,
        purchase_type,
        product_id,
    })
}

impl<V, P, M> PaymentEventService<V, P, M>
where
    V: PaymentEventVerifier,
    P: PurchaseRepository,
    M: WebhookMetrics,
{
    async fn export(&self, outcome: WebhookOutcome) {
        if let Err(error) = self.metrics.record(WebhookSource::Stripe, outcome, 1).await {
            warn!(%error, "failed to record payment webhook metrics");
        }
    }

    async fn apply_completion(
        &self,
        completion: CheckoutCompletion,
    ) -> Result<PaymentEventOutcome, Error> {
        let session_id = completion.session_id.as_str();
        if !completion.is_paid_payment() {
            debug!(
                session_id,
                mode = %completion.mode,
                payment_status = %completion.payment_status,
                "checkout completion does not grant an entitlement"
            );
            self.export(WebhookOutcome::Ignored).await;
            return Ok(PaymentEventOutcome::Ignored);
        }

        let attribution = match read_attribution(&completion) {
            Ok(attribution) => attribution,
            Err(reason) => {
                warn!(session_id, %reason, "checkout completion metadata unusable; acknowledging");
                self.export(WebhookOutcome::Ignored).await;
                return Ok(PaymentEventOutcome::Ignored);
            }
        };

        if self
            .purchases
            .find_by_checkout_session(session_id)
            .await
            .map_err(map_purchase_error)?
            .is_some()
        {
            debug!(session_id, "checkout session already produced a purchase");
            self.export(WebhookOutcome::Duplicate).await;
            return Ok(PaymentEventOutcome::AlreadyProcessed);
        }

        let purchase = Purchase::available(
            attribution.owner_id,
            attribution.purchase_type,
            attribution.product_id,
            session_id,
            self.clock.utc(),
        );
        let outcome = match self.purchases.insert_if_absent(&purchase).await {
            Ok(outcome) => outcome,
            Err(PurchaseRepositoryError::UnknownOwner { owner_id }) => {
                warn!(
                    session_id,
                    %owner_id,
                    "checkout completion names an unknown user; acknowledging"
                );
                self.export(WebhookOutcome::Ignored).await;
                return Ok(PaymentEventOutcome::Ignored);
            }
            Err(err) => return Err(map_purchase_error(err)),
        };
        match outcome {
            RecordOutcome::Inserted => {
                info!(
                    session_id,
                    purchase_id = %purchase.id,
                    owner_id = %purchase.owner_id,
                    purchase_type = purchase.purchase_type.as_str(),
                    "purchase entitlement created"
                );
                self.export(WebhookOutcome::Recorded).await;
                Ok(PaymentEventOutcome::PurchaseCreated(purchase.id))
            }
            RecordOutcome::AlreadyExists => {
                self.export(WebhookOutcome::Duplicate).await;
                Ok(PaymentEventOutcome::AlreadyProcessed)
            }
        }
    }
}

#[async_trait]
impl<V, P, M> PaymentEventCommand for PaymentEventService<V, P, M>
where
    V: PaymentEventVerifier,
    P: PurchaseRepository,
    M: WebhookMetrics,
{
    async fn handle_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEventOutcome, Error> {
        let event = match self.verifier.verify(payload, signature_header) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "payment webhook refused");
                self.export(WebhookOutcome::Rejected).await;
                let message = match err {
                    PaymentEventVerifierError::InvalidSignature { .. } => "invalid webhook signature",
                    PaymentEventVerifierError::Malformed { .. } => "malformed webhook payload",
                };
                return Err(Error::invalid_request(message));
            }
        };

        match event {
            PaymentEvent::CheckoutCompleted(completion) => self.apply_completion(completion).await,
            PaymentEvent::Ignored { event_type } => {
                debug!(%event_type, "payment webhook event ignored");
                self.export(WebhookOutcome::Ignored).await;
                Ok(PaymentEventOutcome::Ignored)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::domain::ports::{MockPaymentEventVerifier, MockPurchaseRepository};
    use crate::domain::service_support::test_clock::fixture_clock;
    use crate::domain::{ErrorCode, SubmissionStatus};
    use rstest::rstest;

    const OWNER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn completion(metadata: &[(&str, &str)]) -> CheckoutCompletion {
        CheckoutCompletion {
            session_id: "cs_test_1".to_owned(),
            mode: "payment".to_owned(),
            payment_status: "paid".to_owned(),
            metadata: metadata
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn verifier_returning(event: PaymentEvent) -> MockPaymentEventVerifier {
        let mut verifier = MockPaymentEventVerifier::new();
        verifier.expect_verify().return_once(move |_, _| Ok(event));
        verifier
    }

    fn service(
        verifier: MockPaymentEventVerifier,
        purchases: MockPurchaseRepository,
    ) -> PaymentEventService<MockPaymentEventVerifier, MockPurchaseRepository> {
        PaymentEventService::with_noop_metrics(
            Arc::new(verifier),
            Arc::new(purchases),
            fixture_clock(),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn paid_completion_creates_available_purchase() {
        let event = PaymentEvent::CheckoutCompleted(completion(&[
            (METADATA_USER_ID, OWNER),
            (METADATA_PURCHASE_TYPE, "PRODUCT_BOOST"),
            (METADATA_PRODUCT_ID, "prod_9"),
        ]));
        let mut purchases = MockPurchaseRepository::new();
        purchases
            .expect_find_by_checkout_session()
            .return_once(|_| Ok(None));
        purchases
            .expect_insert_if_absent()
            .withf(|purchase| {
                purchase.submission_status == SubmissionStatus::Available
                    && purchase.purchase_type == PurchaseType::ProductBoost
                    && purchase.checkout_session_id == "cs_test_1"
                    && purchase.product_id.as_deref() == Some("prod_9")
                    && purchase.owner_id.as_ref() == OWNER
            })
            .times(1)
            .return_once(|_| Ok(RecordOutcome::Inserted));

        let outcome = service(verifier_returning(event), purchases)
            .handle_event(b"{}", "t=1,v1=00")
            .await
            .expect("event handled");

        assert!(matches!(outcome, PaymentEventOutcome::PurchaseCreated(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn redelivery_is_a_no_op() {
        let event = PaymentEvent::CheckoutCompleted(completion(&[
            (METADATA_USER_ID, OWNER),
            (METADATA_PURCHASE_TYPE, "CAROUSEL_HIGHLIGHT"),
        ]));
        let mut purchases = MockPurchaseRepository::new();
        purchases.expect_find_by_checkout_session().return_once(|_| {
            Ok(Some(Purchase::available(
                UserId::new(OWNER).expect("fixture owner"),
                PurchaseType::CarouselHighlight,
                None,
                "cs_test_1",
                chrono::Utc::now(),
            )))
        });
        purchases.expect_insert_if_absent().never();

        let outcome = service(verifier_returning(event), purchases)
            .handle_event(b"{}", "t=1,v1=00")
            .await
            .expect("event handled");

        assert_eq!(outcome, PaymentEventOutcome::AlreadyProcessed);
    }

    #[rstest]
    #[case::missing_user(&[(METADATA_PURCHASE_TYPE, "PRODUCT_BOOST")])]
    #[case::invalid_user(&[(METADATA_USER_ID, "nope"), (METADATA_PURCHASE_TYPE, "PRODUCT_BOOST")])]
    #[case::unknown_type(&[(METADATA_USER_ID, OWNER), (METADATA_PURCHASE_TYPE, "GIFT")])]
    #[tokio::test]
    async fn unusable_metadata_is_acknowledged_without_a_purchase(
        #[case] metadata: &[(&str, &str)],
    ) {
        let event = PaymentEvent::CheckoutCompleted(completion(metadata));
        let mut purchases = MockPurchaseRepository::new();
        purchases.expect_find_by_checkout_session().never();
        purchases.expect_insert_if_absent().never();

        let outcome = service(verifier_returning(event), purchases)
            .handle_event(b"{}", "t=1,v1=00")
            .await
            .expect("event acknowledged");

        assert_eq!(outcome, PaymentEventOutcome::Ignored);
    }

    #[rstest]
    #[tokio::test]
    async fn completions_for_unknown_users_are_acknowledged() {
        let event = PaymentEvent::CheckoutCompleted(completion(&[
            (METADATA_USER_ID, OWNER),
            (METADATA_PURCHASE_TYPE, "PRODUCT_BOOST"),
        ]));
        let mut purchases = MockPurchaseRepository::new();
        purchases
            .expect_find_by_checkout_session()
            .return_once(|_| Ok(None));
        purchases
            .expect_insert_if_absent()
            .times(1)
            .return_once(|_| Err(PurchaseRepositoryError::unknown_owner(OWNER)));

        let outcome = service(verifier_returning(event), purchases)
            .handle_event(b"{}", "t=1,v1=00")
            .await
            .expect("event acknowledged");

        assert_eq!(outcome, PaymentEventOutcome::Ignored);
    }

    #[rstest]
    #[tokio::test]
    async fn other_storage_failures_still_surface() {
        let event = PaymentEvent::CheckoutCompleted(completion(&[
            (METADATA_USER_ID, OWNER),
            (METADATA_PURCHASE_TYPE, "PRODUCT_BOOST"),
        ]));
        let mut purchases = MockPurchaseRepository::new();
        purchases
            .expect_find_by_checkout_session()
            .return_once(|_| Ok(None));
        purchases
            .expect_insert_if_absent()
            .return_once(|_| Err(PurchaseRepositoryError::connection("refused")));

        let err = service(verifier_returning(event), purchases)
            .handle_event(b"{}", "t=1,v1=00")
            .await
            .expect_err("storage failure surfaces");

        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[rstest]
    #[tokio::test]
    async fn unpaid_sessions_are_ignored() {
        let mut unpaid = completion(&[(METADATA_USER_ID, OWNER)]);
        unpaid.payment_status = "unpaid".to_owned();
        let mut purchases = MockPurchaseRepository::new();
        purchases.expect_insert_if_absent().never();

        let outcome = service(
            verifier_returning(PaymentEvent::CheckoutCompleted(unpaid)),
            purchases,
        )
        .handle_event(b"{}", "t=1,v1=00")
        .await
        .expect("event acknowledged");

        assert_eq!(outcome, PaymentEventOutcome::Ignored);
    }

    #[rstest]
    #[tokio::test]
    async fn bad_signatures_are_invalid_requests() {
        let mut verifier = MockPaymentEventVerifier::new();
        verifier
            .expect_verify()
            .return_once(|_, _| Err(PaymentEventVerifierError::invalid_signature("mismatch")));
        let purchases = MockPurchaseRepository::new();

        let err = service(verifier, purchases)
            .handle_event(b"{}", "t=1,v1=00")
            .await
            .expect_err("signature rejected");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn other_event_types_are_ignored() {
        let event = PaymentEvent::Ignored {
            event_type: "invoice.paid".to_owned(),
        };
        let outcome = service(verifier_returning(event), MockPurchaseRepository::new())
            .handle_event(b"{}", "t=1,v1=00")
            .await
            .expect("event acknowledged");

        assert_eq!(outcome, PaymentEventOutcome::Ignored);
    }
}
