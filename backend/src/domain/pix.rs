//! PIX payment notifications and the append-only payment ledger record.
//!
//! Gateways deliver settlement notifications in batches. Each entry is
//! validated into a [`PixNotification`] before anything is written, then
//! recorded as an immutable [`PixPayment`] on first sight of its
//! [`TransactionId`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Maximum length of a PIX transaction id.
pub const TRANSACTION_ID_MAX: usize = 35;
/// Maximum length of an end-to-end id; matches `pix_payments.end_to_end_id`.
pub const END_TO_END_ID_MAX: usize = 64;
/// Maximum number of integer digits accepted in a PIX amount.
const AMOUNT_INTEGER_DIGITS_MAX: usize = 10;

/// Validation errors raised while reading PIX notifications and charges.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PixValidationError {
    #[error("txid must be 1 to {TRANSACTION_ID_MAX} ASCII letters or digits")]
    InvalidTransactionId,
    #[error("valor must be a decimal amount with two fraction digits, e.g. 10.50")]
    InvalidAmount,
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("horario must be an RFC 3339 timestamp")]
    InvalidTimestamp,
    #[error("endToEndId must be 1 to {END_TO_END_ID_MAX} ASCII letters or digits when present")]
    InvalidEndToEndId,
    #[error("unknown payment status: {0}")]
    UnknownStatus(String),
}

/// External PIX transaction identifier (`txid`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Validate and construct a transaction id.
    ///
    /// # Examples
    /// ```
    /// use marketplace::domain::TransactionId;
    ///
    /// assert!(TransactionId::new("abc123").is_ok());
    /// assert!(TransactionId::new("abc-123").is_err());
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, PixValidationError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw.len() <= TRANSACTION_ID_MAX
            && raw.bytes().all(|byte| byte.is_ascii_alphanumeric());
        if valid {
            Ok(Self(raw))
        } else {
            Err(PixValidationError::InvalidTransactionId)
        }
    }

    /// Generate a fresh 32-character id for a charge created by this service.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TransactionId> for String {
    fn from(value: TransactionId) -> Self {
        value.0
    }
}

impl TryFrom<String> for TransactionId {
    type Error = PixValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Monetary amount in BRL cents.
///
/// PIX carries amounts as decimal strings (`"10.50"`); they are held as whole
/// cents to avoid floating point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AmountCents(i64);

impl AmountCents {
    /// Wrap a cent amount loaded from storage.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Parse a PIX decimal amount such as `"10.50"`.
    ///
    /// # Examples
    /// ```
    /// use marketplace::domain::AmountCents;
    ///
    /// let amount = AmountCents::parse_decimal("10.50").expect("valid amount");
    /// assert_eq!(amount.cents(), 1050);
    /// assert_eq!(amount.to_decimal_string(), "10.50");
    /// ```
    pub fn parse_decimal(raw: &str) -> Result<Self, PixValidationError> {
        let (whole, fraction) = raw
            .split_once('.')
            .ok_or(PixValidationError::InvalidAmount)?;
        let digits_only = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if whole.is_empty()
            || whole.len() > AMOUNT_INTEGER_DIGITS_MAX
            || fraction.len() != 2
            || !digits_only(whole)
            || !digits_only(fraction)
        {
            return Err(PixValidationError::InvalidAmount);
        }

        let whole: i64 = whole.parse().map_err(|_| PixValidationError::InvalidAmount)?;
        let fraction: i64 = fraction
            .parse()
            .map_err(|_| PixValidationError::InvalidAmount)?;
        Ok(Self(whole * 100 + fraction))
    }

    /// Amount in cents.
    pub fn cents(self) -> i64 {
        self.0
    }

    /// Render the amount in the PIX wire format.
    pub fn to_decimal_string(self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for AmountCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

/// Status of a recorded PIX payment.
///
/// Records are written once by the webhook and never transition afterwards,
/// so `Completed` is the only state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
}

impl PaymentStatus {
    /// Storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = PixValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            other => Err(PixValidationError::UnknownStatus(other.to_owned())),
        }
    }
}

/// One validated entry of a PIX webhook batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PixNotification {
    pub transaction_id: TransactionId,
    pub amount: AmountCents,
    pub end_to_end_id: Option<String>,
    pub paid_at: DateTime<Utc>,
    /// The entry exactly as delivered, kept for audit.
    pub raw_payload: Value,
}

impl PixNotification {
    /// Validate the wire fields of a webhook entry.
    ///
    /// # Examples
    /// ```
    /// use marketplace::domain::PixNotification;
    /// use serde_json::json;
    ///
    /// let entry = PixNotification::try_from_parts(
    ///     "abc123",
    ///     "10.50",
    ///     None,
    ///     "2024-01-01T00:00:00Z",
    ///     json!({"txid": "abc123"}),
    /// )
    /// .expect("valid entry");
    /// assert_eq!(entry.amount.cents(), 1050);
    /// ```
    pub fn try_from_parts(
        txid: &str,
        valor: &str,
        end_to_end_id: Option<String>,
        horario: &str,
        raw_payload: Value,
    ) -> Result<Self, PixValidationError> {
        let transaction_id = TransactionId::new(txid)?;
        let amount = AmountCents::parse_decimal(valor)?;
        if end_to_end_id.as_deref().is_some_and(|value| {
            value.is_empty()
                || value.len() > END_TO_END_ID_MAX
                || !value.bytes().all(|byte| byte.is_ascii_alphanumeric())
        }) {
            return Err(PixValidationError::InvalidEndToEndId);
        }
        let paid_at = DateTime::parse_from_rfc3339(horario)
            .map_err(|_| PixValidationError::InvalidTimestamp)?
            .with_timezone(&Utc);

        Ok(Self {
            transaction_id,
            amount,
            end_to_end_id,
            paid_at,
            raw_payload,
        })
    }
}

/// Immutable ledger record for a settled PIX payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PixPayment {
    pub transaction_id: TransactionId,
    pub amount: AmountCents,
    pub end_to_end_id: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub status: PaymentStatus,
    pub raw_payload: Value,
    pub created_at: DateTime<Utc>,
}

impl PixPayment {
    /// Build the ledger record for a notification seen for the first time.
    pub fn completed(notification: PixNotification, created_at: DateTime<Utc>) -> Self {
        let PixNotification {
            transaction_id,
            amount,
            end_to_end_id,
            paid_at,
            raw_payload,
        } = notification;
        Self {
            transaction_id,
            amount,
            end_to_end_id,
            paid_at,
            status: PaymentStatus::Completed,
            raw_payload,
            created_at,
        }
    }
}

/// Entries of one webhook delivery after validation.
///
/// Entries that failed validation are only counted; the gateway would
/// redeliver them unchanged, so they are acknowledged and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixBatch {
    pub notifications: Vec<PixNotification>,
    pub rejected: usize,
}

impl PixBatch {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.rejected == 0
    }
}

/// Summary of one webhook delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PixWebhookReceipt {
    /// Entries present in the batch.
    pub received: usize,
    /// Entries recorded for the first time.
    pub recorded: usize,
    /// Entries skipped because their txid was already recorded.
    pub duplicates: usize,
    /// Entries dropped because they failed validation.
    pub rejected: usize,
}

/// Request for an immediate PIX charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixChargeRequest {
    pub amount: AmountCents,
    pub description: Option<String>,
}

impl PixChargeRequest {
    /// Validate a charge request from its wire fields.
    pub fn try_new(amount: &str, description: Option<String>) -> Result<Self, PixValidationError> {
        let amount = AmountCents::parse_decimal(amount)?;
        if amount.cents() <= 0 {
            return Err(PixValidationError::NonPositiveAmount);
        }
        let description = description
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
        Ok(Self {
            amount,
            description,
        })
    }
}

/// Charge created at the PIX gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixCharge {
    pub transaction_id: TransactionId,
    /// Gateway-reported charge status, e.g. `ATIVA`.
    pub status: String,
    /// "Copia e cola" payload the payer pastes into their banking app.
    pub copy_paste: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("abc123", true)]
    #[case("A1b2C3d4E5f6G7h8I9j0K1l2M3n4O5p6Q7r", true)]
    #[case("A1b2C3d4E5f6G7h8I9j0K1l2M3n4O5p6Q7r8", false)]
    #[case("", false)]
    #[case("abc 123", false)]
    #[case("ábc123", false)]
    fn transaction_ids_are_short_ascii_alphanumerics(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(TransactionId::new(raw).is_ok(), valid);
    }

    #[rstest]
    fn generated_transaction_ids_are_valid() {
        let generated = TransactionId::generate();
        assert_eq!(generated.as_ref().len(), 32);
        assert!(TransactionId::new(generated.as_ref()).is_ok());
    }

    #[rstest]
    #[case("10.50", Some(1050))]
    #[case("0.01", Some(1))]
    #[case("9999999999.99", Some(999_999_999_999))]
    #[case("10.5", None)]
    #[case("10", None)]
    #[case(".50", None)]
    #[case("-1.00", None)]
    #[case("1,00", None)]
    #[case("12345678901.00", None)]
    fn parses_pix_decimal_amounts(#[case] raw: &str, #[case] expected: Option<i64>) {
        let parsed = AmountCents::parse_decimal(raw).ok().map(AmountCents::cents);
        assert_eq!(parsed, expected);
    }

    #[rstest]
    fn formats_amounts_with_two_fraction_digits() {
        assert_eq!(AmountCents::from_cents(5).to_decimal_string(), "0.05");
        assert_eq!(AmountCents::from_cents(1050).to_decimal_string(), "10.50");
    }

    #[rstest]
    fn notification_normalises_timestamp_to_utc() {
        let entry = PixNotification::try_from_parts(
            "abc123",
            "10.50",
            Some("E12345678202401010000abcdefghijk".to_owned()),
            "2024-01-01T03:00:00+03:00",
            json!({}),
        )
        .expect("valid entry");
        assert_eq!(entry.paid_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[rstest]
    #[case("abc123", "10.50", "yesterday", PixValidationError::InvalidTimestamp)]
    #[case("abc-123", "10.50", "2024-01-01T00:00:00Z", PixValidationError::InvalidTransactionId)]
    #[case("abc123", "ten", "2024-01-01T00:00:00Z", PixValidationError::InvalidAmount)]
    fn notification_rejects_malformed_fields(
        #[case] txid: &str,
        #[case] valor: &str,
        #[case] horario: &str,
        #[case] expected: PixValidationError,
    ) {
        let result = PixNotification::try_from_parts(txid, valor, None, horario, json!({}));
        assert_eq!(result, Err(expected));
    }

    #[rstest]
    #[case::blank("")]
    #[case::spaces("   ")]
    #[case::too_long(&"E".repeat(END_TO_END_ID_MAX + 1))]
    #[case::punctuation("E123-456")]
    fn notification_rejects_unstorable_end_to_end_ids(#[case] raw: &str) {
        let result = PixNotification::try_from_parts(
            "abc123",
            "10.50",
            Some(raw.to_owned()),
            "2024-01-01T00:00:00Z",
            json!({}),
        );
        assert_eq!(result, Err(PixValidationError::InvalidEndToEndId));
    }

    #[rstest]
    fn notification_accepts_end_to_end_ids_up_to_the_column_width() {
        let longest = "E".repeat(END_TO_END_ID_MAX);
        let entry = PixNotification::try_from_parts(
            "abc123",
            "10.50",
            Some(longest.clone()),
            "2024-01-01T00:00:00Z",
            json!({}),
        )
        .expect("valid entry");
        assert_eq!(entry.end_to_end_id, Some(longest));
    }

    #[rstest]
    fn status_round_trips_through_storage_form() {
        let status: PaymentStatus = PaymentStatus::Completed.as_str().parse().expect("parse");
        assert_eq!(status, PaymentStatus::Completed);
        assert!("REFUNDED".parse::<PaymentStatus>().is_err());
    }

    #[rstest]
    fn charge_requests_reject_zero_amounts() {
        assert_eq!(
            PixChargeRequest::try_new("0.00", None),
            Err(PixValidationError::NonPositiveAmount)
        );
        let request =
            PixChargeRequest::try_new("25.00", Some("  ".to_owned())).expect("valid request");
        assert!(request.description.is_none());
    }
}
