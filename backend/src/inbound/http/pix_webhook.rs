//! PIX settlement webhook receiver.
//!
//! ```text
//! POST /webhooks/pix      {"pix":[{"txid":"abc123","valor":"10.50","horario":"..."}]}
//! POST /webhooks/pix/pix  (same; the gateway appends /pix to the registered URL)
//! ```
//!
//! Every entry is validated on its own. Entries that fail validation are
//! logged, counted and dropped while the rest of the batch is recorded; the
//! gateway would redeliver a refused batch unchanged, so only a storage
//! failure answers with anything but 200. Redelivered transaction ids are
//! acknowledged as duplicates.

use actix_web::web;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::domain::{PixBatch, PixNotification, PixValidationError, PixWebhookReceipt};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_json_value;

/// Webhook body sent by the PIX gateway.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PixWebhookRequest {
    #[serde(default)]
    pub pix: Option<Vec<PixEntryBody>>,
}

/// One settlement notification inside a webhook batch.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PixEntryBody {
    /// Transaction id chosen when the charge was created.
    #[schema(example = "abc123")]
    pub txid: Option<String>,
    /// Settled amount as a decimal string with two fraction digits.
    #[schema(example = "10.50")]
    pub valor: Option<String>,
    /// Settlement id assigned by the PIX network.
    pub end_to_end_id: Option<String>,
    /// Settlement time, RFC 3339.
    #[schema(example = "2024-01-01T12:00:00Z")]
    pub horario: Option<String>,
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Serialize, ToSchema)]
pub struct PixWebhookResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    pub received: usize,
    pub recorded: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

impl From<PixWebhookReceipt> for PixWebhookResponse {
    fn from(receipt: PixWebhookReceipt) -> Self {
        Self {
            status: "ok",
            received: receipt.received,
            recorded: receipt.recorded,
            duplicates: receipt.duplicates,
            rejected: receipt.rejected,
        }
    }
}

/// Why one webhook entry was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryRejection {
    field: &'static str,
    code: &'static str,
    reason: String,
}

impl EntryRejection {
    fn new(field: &'static str, code: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            code,
            reason: reason.into(),
        }
    }
}

impl From<PixValidationError> for EntryRejection {
    fn from(err: PixValidationError) -> Self {
        let (field, code) = match &err {
            PixValidationError::InvalidTransactionId => ("txid", "invalid_txid"),
            PixValidationError::InvalidAmount | PixValidationError::NonPositiveAmount => {
                ("valor", "invalid_amount")
            }
            PixValidationError::InvalidTimestamp => ("horario", "invalid_timestamp"),
            PixValidationError::InvalidEndToEndId => ("endToEndId", "invalid_end_to_end_id"),
            PixValidationError::UnknownStatus(_) => ("status", "invalid_status"),
        };
        Self::new(field, code, err.to_string())
    }
}

fn parse_entry(raw: &Value) -> Result<PixNotification, EntryRejection> {
    let body: PixEntryBody = serde_json::from_value(raw.clone())
        .map_err(|err| EntryRejection::new("pix", "invalid_entry", err.to_string()))?;
    let required = |value: Option<String>, field: &'static str| {
        value.ok_or_else(|| {
            EntryRejection::new(field, "missing_field", format!("{field} is required"))
        })
    };
    let txid = required(body.txid, "txid")?;
    let valor = required(body.valor, "valor")?;
    let horario = required(body.horario, "horario")?;

    PixNotification::try_from_parts(&txid, &valor, body.end_to_end_id, &horario, raw.clone())
        .map_err(EntryRejection::from)
}

/// Validate every entry of a webhook body, dropping the invalid ones.
///
/// Returns an empty batch when `pix` is absent, null, not an array or empty.
fn parse_batch(body: &Value) -> PixBatch {
    let Some(entries) = body.get("pix").and_then(Value::as_array) else {
        return PixBatch::default();
    };
    let mut batch = PixBatch::default();
    for (index, entry) in entries.iter().enumerate() {
        match parse_entry(entry) {
            Ok(notification) => batch.notifications.push(notification),
            Err(rejection) => {
                warn!(
                    index,
                    field = rejection.field,
                    code = rejection.code,
                    reason = %rejection.reason,
                    "dropping invalid pix webhook entry"
                );
                batch.rejected += 1;
            }
        }
    }
    batch
}

/// Receive a batch of PIX settlement notifications.
#[utoipa::path(
    post,
    path = "/webhooks/pix",
    request_body = PixWebhookRequest,
    responses(
        (status = 200, description = "Batch acknowledged; invalid entries are counted as rejected", body = PixWebhookResponse),
        (status = 500, description = "Ledger unavailable; redelivery is safe", body = ErrorSchema)
    ),
    tags = ["webhooks"],
    operation_id = "receivePixWebhook",
    security([])
)]
pub async fn receive_pix_webhook(
    state: web::Data<HttpState>,
    body: web::Bytes,
) -> ApiResult<web::Json<PixWebhookResponse>> {
    let batch = if body.iter().all(u8::is_ascii_whitespace) {
        PixBatch::default()
    } else {
        match parse_json_value(&body) {
            Ok(value) => parse_batch(&value),
            Err(err) => {
                warn!(
                    error = %err,
                    bytes = body.len(),
                    "pix webhook body is not JSON; acknowledging"
                );
                PixBatch::default()
            }
        }
    };

    if batch.is_empty() {
        debug!("pix webhook carried no notifications");
        return Ok(web::Json(PixWebhookReceipt::default().into()));
    }

    let receipt = state.pix_webhook.ingest(batch).await?;
    info!(
        received = receipt.received,
        recorded = receipt.recorded,
        duplicates = receipt.duplicates,
        rejected = receipt.rejected,
        "pix webhook processed"
    );
    Ok(web::Json(receipt.into()))
}
