//! Operations protected by idempotency keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operation a key is scoped to, so the same UUID can be reused across
/// different operations without colliding.
///
/// # Examples
/// ```
/// # use fluxcart::domain::idempotency::MutationType;
/// assert_eq!(MutationType::CheckoutSessions.as_str(), "checkout_sessions");
/// assert_eq!("reorders".parse::<MutationType>().unwrap(), MutationType::Reorders);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    /// `POST /api/v1/cart/items`.
    CartItems,
    /// `POST /api/v1/checkout/session`.
    CheckoutSessions,
    /// `POST /api/v1/orders/{id}/reorder`.
    Reorders,
    /// `POST /api/v1/group-buys`.
    GroupBuys,
}

impl MutationType {
    /// Every mutation type.
    pub const ALL: [Self; 4] = [
        Self::CartItems,
        Self::CheckoutSessions,
        Self::Reorders,
        Self::GroupBuys,
    ];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CartItems => "cart_items",
            Self::CheckoutSessions => "checkout_sessions",
            Self::Reorders => "reorders",
            Self::GroupBuys => "group_buys",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mutation type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid mutation type '{input}'")]
pub struct ParseMutationTypeError {
    /// Rejected input.
    pub input: String,
}

impl FromStr for MutationType {
    type Err = ParseMutationTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|variant| variant.as_str() == s)
            .copied()
            .ok_or_else(|| ParseMutationTypeError {
                input: s.to_owned(),
            })
    }
}
