//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper produces an `invalid_request` error whose details carry
//! `{field, code, value?}` so clients can point at the offending input.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
    InvalidValue,
}

impl ErrorCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::InvalidValue => "invalid_value",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    const fn as_str(self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field: field.as_str(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    ValidationError::new(field, format!("missing required field: {}", field.as_str()))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    ValidationError::new(field, format!("{} must be a valid UUID", field.as_str()))
        .with_value(ErrorCode::InvalidUuid, value)
}

pub(crate) fn invalid_value_error(field: FieldName, value: &str, message: impl Into<String>) -> Error {
    ValidationError::new(field, message).with_value(ErrorCode::InvalidValue, value)
}

/// Parse a UUID-backed identifier such as `ProductId` or `OrderId`.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    ValidationError::new(field, format!("{} must be an RFC 3339 timestamp", field.as_str()))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_rfc3339_timestamp(value: &str, field: FieldName) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid_timestamp_error(field, value))
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode as DomainErrorCode, ProductId};
    use rstest::rstest;
    use serde_json::Value;

    const PRODUCT_ID: FieldName = FieldName::new("productId");

    fn detail<'a>(error: &'a Error, key: &str) -> Option<&'a str> {
        error.details().and_then(|details| details.get(key)).and_then(Value::as_str)
    }

    #[rstest]
    fn ids_parse_with_surrounding_whitespace() {
        let id: ProductId =
            parse_id(" 3fa85f64-5717-4562-b3fc-2c963f66afa6 ", PRODUCT_ID).expect("valid id");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    fn bad_ids_report_the_field_and_value() {
        let error = parse_id::<ProductId>("lamp", PRODUCT_ID).expect_err("not a uuid");
        assert_eq!(error.code(), DomainErrorCode::InvalidRequest);
        assert_eq!(detail(&error, "field"), Some("productId"));
        assert_eq!(detail(&error, "value"), Some("lamp"));
        assert_eq!(detail(&error, "code"), Some("invalid_uuid"));
    }

    #[rstest]
    fn missing_fields_omit_the_value() {
        let error = missing_field_error(FieldName::new("productId"));
        assert_eq!(error.message(), "missing required field: productId");
        assert_eq!(detail(&error, "code"), Some("missing_field"));
        assert_eq!(detail(&error, "value"), None);
    }

    #[rstest]
    #[case("2026-05-01T12:00:00Z", true)]
    #[case("2026-05-01T17:30:00+05:30", true)]
    #[case("2026-05-01", false)]
    #[case("tomorrow", false)]
    fn timestamps_must_be_rfc3339(#[case] raw: &str, #[case] valid: bool) {
        let parsed = parse_rfc3339_timestamp(raw, FieldName::new("deadline"));
        assert_eq!(parsed.is_ok(), valid);
        if let Err(error) = parsed {
            assert_eq!(detail(&error, "code"), Some("invalid_timestamp"));
        }
    }

    #[rstest]
    fn absent_optional_timestamps_are_none() {
        assert_eq!(
            parse_optional_rfc3339_timestamp(None, FieldName::new("startDate")).expect("none"),
            None
        );
    }
}
