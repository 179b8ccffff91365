//! Shared request validation helpers for the HTTP adapter.
//!
//! Every validation failure becomes `400 invalid_request` with a `details`
//! object naming the offending `field` and a stable `code`.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::domain::Error;

pub(crate) fn missing_field_error(field: &str) -> Error {
    Error::invalid_request(format!("{field} is required")).with_details(json!({
        "field": field,
        "code": "missing_field",
    }))
}

pub(crate) fn invalid_field_error(field: &str, code: &str, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": code,
    }))
}

pub(crate) fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw)
        .map_err(|_| invalid_field_error(field, "invalid_uuid", format!("{field} must be a UUID")))
}

/// Decode a JSON body that may be absent.
///
/// An empty body yields `None`; anything else must decode as `T`.
pub(crate) fn parse_optional_json<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| malformed_body_error(&err))
}

/// Decode a JSON body into an untyped value.
pub(crate) fn parse_json_value(body: &[u8]) -> Result<Value, Error> {
    serde_json::from_slice(body).map_err(|err| malformed_body_error(&err))
}

fn malformed_body_error(err: &serde_json::Error) -> Error {
    Error::invalid_request("request body is not valid JSON").with_details(json!({
        "code": "malformed_json",
        "line": err.line(),
        "column": err.column(),
    }))
}
