//! Domain port for recording webhook delivery outcomes.
//!
//! Implementations may export to Prometheus or discard metrics in tests.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording webhook metrics.
    pub enum WebhookMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "webhook metrics exporter failed: {message}",
    }
}

/// Gateway that sent the webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookSource {
    Pix,
    Stripe,
}

impl WebhookSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pix => "pix",
            Self::Stripe => "stripe",
        }
    }
}

/// What happened to one webhook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First sighting; a record was written.
    Recorded,
    /// Redelivery of something already recorded.
    Duplicate,
    /// Authentic delivery that was acknowledged without acting on it.
    Ignored,
    /// Delivery refused (bad signature or invalid payload).
    Rejected,
}

impl WebhookOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::Rejected => "rejected",
        }
    }
}

/// Metrics recording port for webhook deliveries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookMetrics: Send + Sync {
    /// Count `count` entries from `source` with the given outcome.
    async fn record(
        &self,
        source: WebhookSource,
        outcome: WebhookOutcome,
        count: u64,
    ) -> Result<(), WebhookMetricsError>;
}

/// No-op implementation for when metrics are disabled or in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpWebhookMetrics;

#[async_trait]
impl WebhookMetrics for NoOpWebhookMetrics {
    async fn record(
        &self,
        _source: WebhookSource,
        _outcome: WebhookOutcome,
        _count: u64,
    ) -> Result<(), WebhookMetricsError> {
        Ok(())
    }
}
