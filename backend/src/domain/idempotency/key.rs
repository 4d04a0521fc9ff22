//! Client-supplied idempotency keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why an `Idempotency-Key` header was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdempotencyKeyValidationError {
    #[error("idempotency key must not be empty")]
    EmptyKey,
    #[error("idempotency key must be a valid UUID")]
    InvalidKey,
}

/// Retry token chosen by the client. Any UUID spelling is accepted and
/// normalised, so `550E8400-...` and `550e8400-...` name the same key.
///
/// # Examples
/// ```
/// # use fluxcart::domain::idempotency::IdempotencyKey;
/// let key: IdempotencyKey = "550E8400E29B41D4A716446655440000".parse().unwrap();
/// assert_eq!(key.to_string(), "550e8400-e29b-41d4-a716-446655440000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Parse header text. Surrounding whitespace is rejected rather than
    /// trimmed.
    ///
    /// # Errors
    /// [`IdempotencyKeyValidationError::EmptyKey`] for an empty header and
    /// [`IdempotencyKeyValidationError::InvalidKey`] for anything else that is
    /// not a UUID.
    pub fn new(key: impl AsRef<str>) -> Result<Self, IdempotencyKeyValidationError> {
        match key.as_ref() {
            "" => Err(IdempotencyKeyValidationError::EmptyKey),
            raw if raw.trim() != raw => Err(IdempotencyKeyValidationError::InvalidKey),
            raw => Uuid::parse_str(raw)
                .map(Self)
                .map_err(|_| IdempotencyKeyValidationError::InvalidKey),
        }
    }

    /// Key restored from storage.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for IdempotencyKey {
    type Err = IdempotencyKeyValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = IdempotencyKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
