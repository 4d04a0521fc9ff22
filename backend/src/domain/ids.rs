//! UUID-backed identifiers for domain aggregates.
//!
//! Each identifier keeps both the parsed UUID and its canonical string form so
//! adapters can borrow either without re-encoding.

use std::fmt;

/// Validation errors shared by every identifier type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// The identifier was empty.
    #[error("{kind} must not be empty")]
    Empty {
        /// Human readable identifier kind.
        kind: &'static str,
    },
    /// The identifier was not a valid UUID.
    #[error("{kind} must be a valid UUID")]
    Invalid {
        /// Human readable identifier kind.
        kind: &'static str,
    },
}

macro_rules! define_uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid, String);

        impl $name {
            /// Validate and construct the identifier from borrowed input.
            ///
            /// # Errors
            /// Returns [`IdValidationError`] for empty, padded, or non-UUID input.
            pub fn new(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                Self::from_owned(id.as_ref().to_owned())
            }

            /// Construct the identifier from an already validated UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid, uuid.to_string())
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self::from_uuid(uuid::Uuid::new_v4())
            }

            fn from_owned(id: String) -> Result<Self, IdValidationError> {
                if id.is_empty() {
                    return Err(IdValidationError::Empty { kind: $kind });
                }
                if id.trim() != id {
                    return Err(IdValidationError::Invalid { kind: $kind });
                }
                let parsed = uuid::Uuid::parse_str(&id)
                    .map_err(|_| IdValidationError::Invalid { kind: $kind })?;
                Ok(Self(parsed, id))
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.1.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_ref())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.1
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::from_owned(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_uuid_id!(
    /// Stable user identifier.
    UserId,
    "user id"
);
define_uuid_id!(
    /// Catalog product identifier.
    ProductId,
    "product id"
);
define_uuid_id!(
    /// Cart line identifier.
    CartItemId,
    "cart item id"
);
define_uuid_id!(
    /// Order identifier.
    OrderId,
    "order id"
);
define_uuid_id!(
    /// Group-buy identifier.
    GroupBuyId,
    "group-buy id"
);
