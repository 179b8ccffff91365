//! `Stripe-Signature` verification.
//!
//! The header looks like `t=1700000000,v1=<hex>,v1=<hex>`. Each `v1` entry is
//! an HMAC-SHA256 of `"{t}.{raw body}"` keyed by the endpoint secret; during
//! secret rotation Stripe sends one entry per active secret, so any match is
//! accepted. Timestamps outside the tolerance window are rejected to limit
//! replay.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use mockable::Clock;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;
use zeroize::Zeroizing;

use super::dto::EventDto;
use crate::domain::PaymentEvent;
use crate::domain::ports::{PaymentEventVerifier, PaymentEventVerifierError};

type HmacSha256 = Hmac<Sha256>;

/// Replay window recommended by Stripe.
pub const DEFAULT_SIGNATURE_TOLERANCE: Duration = Duration::from_secs(300);

/// Stripe implementation of [`PaymentEventVerifier`].
pub struct StripeWebhookVerifier {
    secret: Zeroizing<Vec<u8>>,
    clock: Arc<dyn Clock>,
    tolerance: Duration,
}

impl StripeWebhookVerifier {
    pub fn new(secret: Zeroizing<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: Zeroizing::new(secret.as_bytes().to_vec()),
            clock,
            tolerance: DEFAULT_SIGNATURE_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn check_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader<'_>,
    ) -> Result<(), PaymentEventVerifierError> {
        let age = self.clock.utc().timestamp().checked_sub(header.timestamp);
        if age.is_none_or(|age| age.unsigned_abs() > self.tolerance.as_secs()) {
            warn!(?age, "stripe webhook timestamp outside tolerance");
            return Err(PaymentEventVerifierError::invalid_signature(
                "timestamp outside tolerance",
            ));
        }

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| PaymentEventVerifierError::invalid_signature("unusable signing secret"))?;
        mac.update(header.raw_timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let matched = header.signatures.iter().any(|candidate| {
            candidate.len() == expected.len()
                && bool::from(expected.as_bytes().ct_eq(candidate.as_bytes()))
        });
        if matched {
            Ok(())
        } else {
            Err(PaymentEventVerifierError::invalid_signature(
                "no matching v1 signature",
            ))
        }
    }
}

impl PaymentEventVerifier for StripeWebhookVerifier {
    fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, PaymentEventVerifierError> {
        let header = SignatureHeader::parse(signature_header)?;
        self.check_signature(payload, &header)?;

        let event: EventDto = serde_json::from_slice(payload)
            .map_err(|err| PaymentEventVerifierError::malformed(err.to_string()))?;
        event
            .into_domain()
            .map_err(|err| PaymentEventVerifierError::malformed(err.to_string()))
    }
}

#[derive(Debug)]
struct SignatureHeader<'a> {
    raw_timestamp: &'a str,
    timestamp: i64,
    signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> Result<Self, PaymentEventVerifierError> {
        let mut raw_timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',').map(str::trim) {
            if let Some(t) = part.strip_prefix("t=") {
                raw_timestamp = Some(t);
            } else if let Some(sig) = part.strip_prefix("v1=") {
                signatures.push(sig);
            }
        }

        let raw_timestamp = raw_timestamp
            .ok_or_else(|| PaymentEventVerifierError::invalid_signature("missing timestamp"))?;
        let timestamp = raw_timestamp
            .parse()
            .map_err(|_| PaymentEventVerifierError::invalid_signature("invalid timestamp"))?;
        if signatures.is_empty() {
            return Err(PaymentEventVerifierError::invalid_signature(
                "missing v1 signature",
            ));
        }
        Ok(Self {
            raw_timestamp,
            timestamp,
            signatures,
        })
    }
}
