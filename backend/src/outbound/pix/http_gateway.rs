//! Reqwest-backed PIX gateway client.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Client, Identity, StatusCode, Url};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::dto::{
    CHARGE_EXPIRY_SECONDS, CalendarDto, ChargeRequestDto, ChargeResponseDto, TokenRequestDto,
    TokenResponseDto, ValueDto,
};
use super::token_cache::{IssuedToken, TokenCache};
use crate::domain::ports::{PixChargeGateway, PixChargeGatewayError};
use crate::domain::{PixCharge, PixChargeRequest, TransactionId};

const BODY_PREVIEW_CHARS: usize = 160;

/// Connection settings for the PIX gateway.
pub struct PixGatewayConfig {
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    /// PIX key receiving the funds.
    pub pix_key: String,
    /// PEM client certificate for mutual TLS.
    pub certificate_path: PathBuf,
    /// PEM private key matching `certificate_path`.
    pub private_key_path: PathBuf,
    pub timeout: Duration,
}

/// PIX implementation of [`PixChargeGateway`].
pub struct PixHttpGateway {
    client: Client,
    base_url: Url,
    client_id: String,
    client_secret: Zeroizing<String>,
    pix_key: String,
    tokens: TokenCache,
}

impl PixHttpGateway {
    /// Build the client, loading the mutual TLS identity from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PixChargeGatewayError::Authentication`] when the certificate
    /// or key cannot be read or parsed, and
    /// [`PixChargeGatewayError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(config: PixGatewayConfig, clock: Arc<dyn Clock>) -> Result<Self, PixChargeGatewayError> {
        let identity = load_identity(&config.certificate_path, &config.private_key_path)?;
        let client = Client::builder()
            .identity(identity)
            .timeout(config.timeout)
            .build()
            .map_err(map_transport_error)?;
        Ok(Self::with_client(client, config, clock))
    }

    /// Build the gateway around a preconfigured client.
    pub fn with_client(client: Client, config: PixGatewayConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            base_url: config.base_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
            pix_key: config.pix_key,
            tokens: TokenCache::new(clock),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, PixChargeGatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PixChargeGatewayError::transport("PIX base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn access_token(&self) -> Result<Zeroizing<String>, PixChargeGatewayError> {
        self.tokens.get_or_fetch(|| self.exchange_token()).await
    }

    async fn exchange_token(&self) -> Result<IssuedToken, PixChargeGatewayError> {
        let url = self.endpoint(&["oauth", "token"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(self.client_secret.as_str()))
            .json(&TokenRequestDto {
                grant_type: "client_credentials",
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(PixChargeGatewayError::authentication(format!(
                "token exchange returned status {}: {}",
                status.as_u16(),
                body_preview(body.as_ref())
            )));
        }
        let token: TokenResponseDto = serde_json::from_slice(body.as_ref()).map_err(|err| {
            PixChargeGatewayError::decode(format!("invalid token payload: {err}"))
        })?;
        Ok(IssuedToken {
            access_token: Zeroizing::new(token.access_token),
            expires_in: token.expires_in,
        })
    }
}

#[async_trait]
impl PixChargeGateway for PixHttpGateway {
    async fn create_charge(
        &self,
        transaction_id: &TransactionId,
        request: &PixChargeRequest,
    ) -> Result<PixCharge, PixChargeGatewayError> {
        let token = self.access_token().await?;
        let url = self.endpoint(&["v2", "cob", transaction_id.as_ref()])?;
        let body = charge_body(&self.pix_key, request);

        let response = self
            .client
            .put(url)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let payload = response.bytes().await.map_err(map_transport_error)?;
        if status == StatusCode::UNAUTHORIZED {
            warn!("pix gateway rejected cached token");
            self.tokens.invalidate().await;
            return Err(PixChargeGatewayError::authentication(
                "bearer token rejected",
            ));
        }
        if !status.is_success() {
            return Err(map_status_error(status, payload.as_ref()));
        }

        let charge: ChargeResponseDto = serde_json::from_slice(payload.as_ref()).map_err(|err| {
            PixChargeGatewayError::decode(format!("invalid charge payload: {err}"))
        })?;
        debug!(txid = %charge.txid, status = %charge.status, "pix charge accepted");
        let transaction_id = TransactionId::new(charge.txid)
            .map_err(|err| PixChargeGatewayError::decode(format!("invalid txid: {err}")))?;
        Ok(PixCharge {
            transaction_id,
            status: charge.status,
            copy_paste: charge.pix_copia_e_cola,
        })
    }
}

fn charge_body<'a>(pix_key: &'a str, request: &'a PixChargeRequest) -> ChargeRequestDto<'a> {
    ChargeRequestDto {
        calendario: CalendarDto {
            expiracao: CHARGE_EXPIRY_SECONDS,
        },
        valor: ValueDto {
            original: request.amount.to_decimal_string(),
        },
        chave: pix_key,
        solicitacao_pagador: request.description.as_deref(),
    }
}

fn load_identity(
    certificate_path: &Path,
    private_key_path: &Path,
) -> Result<Identity, PixChargeGatewayError> {
    let read = |path: &Path| {
        std::fs::read(path).map_err(|err| {
            PixChargeGatewayError::authentication(format!(
                "failed to read {}: {err}",
                path.display()
            ))
        })
    };
    let mut pem = Zeroizing::new(read(certificate_path)?);
    pem.push(b'\n');
    pem.extend_from_slice(&Zeroizing::new(read(private_key_path)?));
    Identity::from_pem(&pem).map_err(|err| {
        PixChargeGatewayError::authentication(format!("invalid client certificate: {err}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> PixChargeGatewayError {
    if error.is_timeout() {
        PixChargeGatewayError::timeout(error.to_string())
    } else {
        PixChargeGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PixChargeGatewayError {
    let preview = body_preview(body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PixChargeGatewayError::timeout(format!("status {}: {preview}", status.as_u16()))
        }
        StatusCode::FORBIDDEN => PixChargeGatewayError::authentication(format!(
            "status {}: {preview}",
            status.as_u16()
        )),
        _ => PixChargeGatewayError::rejected(status.as_u16(), preview),
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
