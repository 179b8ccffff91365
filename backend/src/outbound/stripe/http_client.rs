//! Reqwest-backed Stripe checkout gateway.
//!
//! Requests are form-encoded and authenticated with the secret key as the
//! HTTP basic username. The adapter owns transport concerns only: URL
//! building, status mapping, and decoding into domain types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{CheckoutSessionDto, CustomerDto, ErrorEnvelopeDto};
use crate::domain::ports::{CheckoutGateway, CheckoutGatewayError};
use crate::domain::{
    CheckoutSession, CheckoutSessionDraft, CustomerLookup, METADATA_USER_ID, NewCustomer,
    PaymentCustomerId,
};

/// Production API origin.
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/";

const BODY_PREVIEW_CHARS: usize = 160;

/// Stripe implementation of [`CheckoutGateway`].
pub struct StripeCheckoutGateway {
    client: Client,
    base: Url,
    secret_key: Zeroizing<String>,
}

impl StripeCheckoutGateway {
    /// Build a gateway against `base` (usually [`DEFAULT_STRIPE_API_BASE`]).
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutGatewayError::Transport`] when `base` cannot carry a
    /// path or the HTTP client cannot be constructed.
    pub fn new(
        base: Url,
        secret_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, CheckoutGatewayError> {
        if base.cannot_be_a_base() {
            return Err(CheckoutGatewayError::transport(format!(
                "invalid Stripe API base {base}"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_transport_error)?;
        Ok(Self {
            client,
            base,
            secret_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CheckoutGatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| CheckoutGatewayError::transport("Stripe API base cannot carry a path"))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(self.secret_key.as_str(), None::<&str>)
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckoutGateway {
    async fn retrieve_customer(
        &self,
        customer_id: &PaymentCustomerId,
    ) -> Result<CustomerLookup, CheckoutGatewayError> {
        let url = self.endpoint(&["customers", customer_id.as_ref()])?;
        let response = self
            .authorised(self.client.get(url))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if status == StatusCode::NOT_FOUND {
            debug!(%customer_id, "stripe customer missing");
            return Ok(CustomerLookup::Gone);
        }
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let customer: CustomerDto = decode(body.as_ref())?;
        if customer.deleted {
            debug!(customer_id = %customer.id, "stripe customer deleted");
            return Ok(CustomerLookup::Gone);
        }
        Ok(CustomerLookup::Active)
    }

    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<PaymentCustomerId, CheckoutGatewayError> {
        let url = self.endpoint(&["customers"])?;
        let form = vec![
            ("email".to_owned(), customer.email.clone()),
            ("name".to_owned(), customer.name.clone()),
            (
                format!("metadata[{METADATA_USER_ID}]"),
                customer.user_id.clone(),
            ),
        ];
        let created: CustomerDto = self.post_form(url, &form).await?;
        PaymentCustomerId::new(created.id)
            .map_err(|err| CheckoutGatewayError::decode(format!("invalid customer id: {err}")))
    }

    async fn create_session(
        &self,
        draft: &CheckoutSessionDraft,
    ) -> Result<CheckoutSession, CheckoutGatewayError> {
        let url = self.endpoint(&["checkout", "sessions"])?;
        let session: CheckoutSessionDto = self.post_form(url, &session_form(draft)).await?;
        let checkout_url = session.url.ok_or_else(|| {
            CheckoutGatewayError::decode(format!("checkout session {} has no url", session.id))
        })?;
        Ok(CheckoutSession {
            id: session.id,
            url: checkout_url,
        })
    }
}

impl StripeCheckoutGateway {
    async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &[(String, String)],
    ) -> Result<T, CheckoutGatewayError> {
        let response = self
            .authorised(self.client.post(url))
            .form(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        decode(body.as_ref())
    }
}

fn session_form(draft: &CheckoutSessionDraft) -> Vec<(String, String)> {
    let mut form = vec![
        ("customer".to_owned(), draft.customer_id.to_string()),
        ("mode".to_owned(), draft.mode.as_str().to_owned()),
        ("line_items[0][price]".to_owned(), draft.price_id.clone()),
        ("line_items[0][quantity]".to_owned(), "1".to_owned()),
        ("success_url".to_owned(), draft.success_url.clone()),
        ("cancel_url".to_owned(), draft.cancel_url.clone()),
    ];
    form.extend(
        draft
            .metadata
            .iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
    );
    form
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, CheckoutGatewayError> {
    serde_json::from_slice(body).map_err(|error| {
        CheckoutGatewayError::decode(format!("invalid Stripe JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> CheckoutGatewayError {
    if error.is_timeout() {
        CheckoutGatewayError::timeout(error.to_string())
    } else {
        CheckoutGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> CheckoutGatewayError {
    let message = match serde_json::from_slice::<ErrorEnvelopeDto>(body) {
        Ok(envelope) => match (envelope.error.code, envelope.error.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => body_preview(body),
        },
        Err(_) => body_preview(body),
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            CheckoutGatewayError::timeout(format!("status {}: {message}", status.as_u16()))
        }
        _ => CheckoutGatewayError::rejected(status.as_u16(), message),
    }
}

fn body_preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect::<String>()
        .trim()
        .to_owned()
}
