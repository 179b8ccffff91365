//! Prometheus adapter for webhook delivery outcomes.
//!
//! # Metric Specification
//!
//! - **Name**: `marketplace_webhook_entries_total`
//! - **Type**: Counter
//! - **Labels**:
//!   - `source`: `pix` or `stripe`
//!   - `outcome`: `recorded`, `duplicate`, `ignored`, or `rejected`
//!
//! PIX deliveries are batches, so one request may add more than one to the
//! counter.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::ports::{WebhookMetrics, WebhookMetricsError, WebhookOutcome, WebhookSource};

/// Prometheus-backed [`WebhookMetrics`].
pub struct PrometheusWebhookMetrics {
    entries_total: IntCounterVec,
}

impl PrometheusWebhookMetrics {
    /// Create and register the counter with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let entries_total = IntCounterVec::new(
            Opts::new(
                "marketplace_webhook_entries_total",
                "Webhook entries processed by source and outcome",
            ),
            &["source", "outcome"],
        )?;
        registry.register(Box::new(entries_total.clone()))?;
        Ok(Self { entries_total })
    }
}

#[async_trait]
impl WebhookMetrics for PrometheusWebhookMetrics {
    async fn record(
        &self,
        source: WebhookSource,
        outcome: WebhookOutcome,
        count: u64,
    ) -> Result<(), WebhookMetricsError> {
        self.entries_total
            .get_metric_with_label_values(&[source.as_str(), outcome.as_str()])
            .map_err(|err| WebhookMetricsError::export(err.to_string()))?
            .inc_by(count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn registers_counter_once() {
        let registry = Registry::new();
        PrometheusWebhookMetrics::new(&registry).expect("first registration");
        assert!(PrometheusWebhookMetrics::new(&registry).is_err());
    }

    #[rstest]
    #[case(WebhookSource::Pix, WebhookOutcome::Recorded, 3)]
    #[case(WebhookSource::Stripe, WebhookOutcome::Ignored, 1)]
    #[tokio::test]
    async fn adds_count_under_source_and_outcome(
        #[case] source: WebhookSource,
        #[case] outcome: WebhookOutcome,
        #[case] count: u64,
    ) {
        let registry = Registry::new();
        let metrics = PrometheusWebhookMetrics::new(&registry).expect("registration");

        metrics.record(source, outcome, count).await.expect("recorded");
        metrics.record(source, outcome, 1).await.expect("recorded");

        let counter = metrics
            .entries_total
            .with_label_values(&[source.as_str(), outcome.as_str()]);
        assert_eq!(counter.get(), count + 1);
        assert!(
            registry
                .gather()
                .iter()
                .any(|family| family.name() == "marketplace_webhook_entries_total")
        );
    }
}
