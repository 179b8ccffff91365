//! Driving port for PIX webhook ingestion.

use async_trait::async_trait;

use crate::domain::{Error, PixBatch, PixWebhookReceipt};

/// Records a batch of PIX notifications exactly once per txid.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PixWebhookCommand: Send + Sync {
    /// Record every notification whose transaction id is new.
    ///
    /// Redelivered transaction ids are counted as duplicates, not errors.
    /// Entries that failed validation are counted as rejected.
    async fn ingest(&self, batch: PixBatch) -> Result<PixWebhookReceipt, Error>;
}
