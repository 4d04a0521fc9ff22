//! Shopping cart lines and hold tokens.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CartItemId, GroupBuyId, ProductId, ProductSummary, UserId};

/// How the shopper intends to take the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineKind {
    /// Outright purchase.
    #[default]
    Buy,
    /// Time-boxed rental.
    Rent,
    /// Swap against another item.
    Swap,
}

impl LineKind {
    /// All kinds, in storage order.
    pub const ALL: [Self; 3] = [Self::Buy, Self::Rent, Self::Swap];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Rent => "RENT",
            Self::Swap => "SWAP",
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown line kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown line kind '{input}': expected BUY, RENT or SWAP")]
pub struct ParseLineKindError {
    /// Rejected input.
    pub input: String,
}

impl FromStr for LineKind {
    type Err = ParseLineKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ParseLineKindError {
                input: s.to_owned(),
            })
    }
}

const HOLD_TOKEN_LEN: usize = 10;

/// Opaque reservation token attached to a cart line.
///
/// Tokens are unique across all cart lines. They are not checked against
/// inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct HoldId(String);

impl HoldId {
    /// Token for a line added from the storefront.
    #[must_use]
    pub fn for_cart() -> Self {
        Self::random_with_prefix("hold")
    }

    /// Token for a line copied from a previous order.
    #[must_use]
    pub fn for_reorder() -> Self {
        Self::random_with_prefix("re")
    }

    /// Deterministic token for a settled group-buy participant, so a retried
    /// settlement never places the same hold twice.
    #[must_use]
    pub fn for_group_buy(group_buy: &GroupBuyId, user: &UserId) -> Self {
        Self(format!(
            "gb_{}_{}",
            group_buy.as_uuid().simple(),
            user.as_uuid().simple()
        ))
    }

    /// Rebuild a stored token.
    #[must_use]
    pub const fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    fn random_with_prefix(prefix: &str) -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(HOLD_TOKEN_LEN)
            .map(|byte| char::from(byte).to_ascii_lowercase())
            .collect();
        Self(format!("{prefix}_{token}"))
    }
}

impl AsRef<str> for HoldId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validation errors for cart lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartValidationError {
    /// Quantity below one on a new line.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// Rental end precedes its start.
    #[error("rental end date must not precede the start date")]
    InvertedWindow,
}

/// Optional rental window of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalWindow {
    /// First rental day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Last rental day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl RentalWindow {
    /// Validate the window ordering.
    ///
    /// # Errors
    /// Returns [`CartValidationError::InvertedWindow`] when both ends are set
    /// and the end precedes the start.
    pub fn new(
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Self, CartValidationError> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                return Err(CartValidationError::InvertedWindow);
            }
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }
}

/// Stored cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line identifier.
    #[schema(value_type = String)]
    pub id: CartItemId,
    /// Owner.
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// Referenced product.
    #[schema(value_type = String)]
    pub product_id: ProductId,
    /// Quantity, at least one.
    pub qty: u32,
    /// Purchase kind.
    pub kind: LineKind,
    /// Optional rental window.
    #[serde(flatten)]
    pub window: RentalWindow,
    /// Reservation token.
    #[schema(value_type = String)]
    pub hold_id: HoldId,
    /// Creation time; lines are listed in this order.
    pub created_at: DateTime<Utc>,
}

/// Cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Stored line.
    #[serde(flatten)]
    pub item: CartItem,
    /// Product summary with the live price.
    pub product: ProductSummary,
}

/// Validated request to create a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    /// Owner.
    pub user_id: UserId,
    /// Referenced product.
    pub product_id: ProductId,
    /// Quantity, at least one.
    pub qty: u32,
    /// Purchase kind.
    pub kind: LineKind,
    /// Optional rental window.
    pub window: RentalWindow,
    /// Reservation token.
    pub hold_id: HoldId,
}

impl NewCartItem {
    /// Validate a new line.
    ///
    /// # Errors
    /// Returns [`CartValidationError::ZeroQuantity`] when `qty` is zero.
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        qty: u32,
        kind: LineKind,
        window: RentalWindow,
        hold_id: HoldId,
    ) -> Result<Self, CartValidationError> {
        if qty == 0 {
            return Err(CartValidationError::ZeroQuantity);
        }
        Ok(Self {
            user_id,
            product_id,
            qty,
            kind,
            window,
            hold_id,
        })
    }
}
