//! Helpers for parsing idempotency headers in HTTP handlers.

use actix_web::http::header::HeaderMap;

use crate::domain::{Error, IdempotencyKey, IdempotencyKeyValidationError};

/// HTTP header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Extract the idempotency key from request headers.
pub fn extract_idempotency_key(
    headers: &HeaderMap,
) -> Result<Option<IdempotencyKey>, IdempotencyKeyValidationError> {
    let Some(header_value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key_str = header_value
        .to_str()
        .map_err(|_| IdempotencyKeyValidationError::InvalidKey)?;

    IdempotencyKey::new(key_str).map(Some)
}

/// Map idempotency key validation errors to domain errors.
pub fn map_idempotency_key_error(err: IdempotencyKeyValidationError) -> Error {
    match err {
        IdempotencyKeyValidationError::EmptyKey => {
            Error::invalid_request("idempotency-key header must not be empty")
        }
        IdempotencyKeyValidationError::InvalidKey => {
            Error::invalid_request("idempotency-key header must be a valid uuid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};
    use rstest::rstest;

    fn headers_with(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(raw) = value {
            headers.insert(
                HeaderName::from_static("idempotency-key"),
                HeaderValue::from_static(raw),
            );
        }
        headers
    }

    #[rstest]
    fn absent_header_means_no_key() {
        assert_eq!(extract_idempotency_key(&headers_with(None)), Ok(None));
    }

    #[rstest]
    fn uuid_headers_become_keys() {
        let key = extract_idempotency_key(&headers_with(Some(
            "550e8400-e29b-41d4-a716-446655440000",
        )))
        .expect("valid key")
        .expect("key present");
        assert_eq!(key.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[rstest]
    #[case("", "idempotency-key header must not be empty")]
    #[case("retry-1", "idempotency-key header must be a valid uuid")]
    fn invalid_headers_map_to_bad_requests(#[case] raw: &'static str, #[case] message: &str) {
        let error = extract_idempotency_key(&headers_with(Some(raw)))
            .map_err(map_idempotency_key_error)
            .expect_err("invalid key");
        assert_eq!(error.message(), message);
    }
}
