//! Stripe wire payloads.
//!
//! Only the fields the marketplace reads are modelled; everything else in
//! Stripe's responses is ignored.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::{CheckoutCompletion, PaymentEvent};

pub(super) const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
pub(super) struct CustomerDto {
    pub id: String,
    /// Present and `true` on tombstones returned for deleted customers.
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutSessionDto {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub error: ErrorBodyDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EventDto {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventDataDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct EventDataDto {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletedSessionDto {
    id: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

impl EventDto {
    /// Convert into a domain event, decoding the object only for event types
    /// the marketplace acts on.
    pub(super) fn into_domain(self) -> Result<PaymentEvent, serde_json::Error> {
        if self.event_type != CHECKOUT_SESSION_COMPLETED {
            return Ok(PaymentEvent::Ignored {
                event_type: self.event_type,
            });
        }
        let session: CompletedSessionDto = serde_json::from_value(self.data.object)?;
        Ok(PaymentEvent::CheckoutCompleted(CheckoutCompletion {
            session_id: session.id,
            mode: session.mode.unwrap_or_default(),
            payment_status: session.payment_status.unwrap_or_default(),
            metadata: session.metadata.unwrap_or_default(),
        }))
    }
}
