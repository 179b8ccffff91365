//! PIX gateway wire payloads (BACEN "cob" API).

use serde::{Deserialize, Serialize};

/// Seconds a charge stays payable.
pub(super) const CHARGE_EXPIRY_SECONDS: u32 = 3600;

#[derive(Debug, Serialize)]
pub(super) struct TokenRequestDto {
    pub grant_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponseDto {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChargeRequestDto<'a> {
    pub calendario: CalendarDto,
    pub valor: ValueDto,
    pub chave: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solicitacao_pagador: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(super) struct CalendarDto {
    pub expiracao: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct ValueDto {
    pub original: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChargeResponseDto {
    pub txid: String,
    pub status: String,
    #[serde(default)]
    pub pix_copia_e_cola: Option<String>,
}
