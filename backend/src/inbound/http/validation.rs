//! Shared validation helpers for inbound HTTP adapters.
//!
//! Field errors are `invalid_request` envelopes whose details name the
//! offending field and a stable code, so clients can highlight the input.

use std::str::FromStr;

use actix_web::HttpRequest;
use actix_web::error::JsonPayloadError;
use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidValue,
    MalformedBody,
}

impl ErrorCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidValue => "invalid_value",
            Self::MalformedBody => "malformed_body",
        }
    }
}

/// HTTP field name as the client spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub(crate) const fn as_str(self) -> &'static str {
        self.0
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    Error::invalid_request(format!("missing required field: {field}")).with_details(json!({
        "field": field,
        "code": ErrorCode::MissingField.as_str(),
    }))
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    Error::invalid_request(format!("{field} must be a valid UUID")).with_details(json!({
        "field": field,
        "value": value,
        "code": ErrorCode::InvalidUuid.as_str(),
    }))
}

pub(crate) fn invalid_value_error(field: FieldName, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": ErrorCode::InvalidValue.as_str(),
    }))
}

/// Parse a UUID-backed identifier, blaming `field` on failure.
pub(crate) fn parse_id<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: FromStr,
{
    if value.trim().is_empty() {
        return Err(missing_field_error(field));
    }
    value
        .parse::<T>()
        .map_err(|_| invalid_uuid_error(field, value))
}

/// Map body deserialisation failures onto the error envelope.
///
/// Installed through `web::JsonConfig::error_handler`.
pub(crate) fn json_error_handler(error: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = match &error {
        JsonPayloadError::Deserialize(inner) => inner.to_string(),
        other => other.to_string(),
    };
    Error::invalid_request(message)
        .with_details(json!({ "code": ErrorCode::MalformedBody.as_str() }))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode as DomainCode, RouteId};
    use rstest::rstest;

    const FIELD: FieldName = FieldName::new("routeId");

    #[rstest]
    fn parses_valid_identifiers() {
        let id: RouteId =
            parse_id("3fa85f64-5717-4562-b3fc-2c963f66afa6", FIELD).expect("valid route id");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    #[case("", "missing_field")]
    #[case("  ", "missing_field")]
    #[case("not-a-uuid", "invalid_uuid")]
    fn reports_field_and_code(#[case] raw: &str, #[case] code: &str) {
        let err = parse_id::<RouteId>(raw, FIELD).expect_err("invalid id");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details.get("field"), Some(&json!("routeId")));
        assert_eq!(details.get("code"), Some(&json!(code)));
    }
}
