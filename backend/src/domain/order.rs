//! Orders and their price-snapshotted items.
//!
//! An order is immutable once written except for its status. Item prices are
//! captured at checkout and never re-read from the live catalog.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::pricing::{LineAmount, Totals, compute_totals};
use super::{LineKind, OrderId, ProductId, ProductSummary, UserId};

/// Order lifecycle status.
///
/// Checkout only ever produces [`OrderStatus::Paid`]; the remaining states are
/// reserved for fulfilment tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Awaiting payment.
    Pending,
    /// Payment confirmed.
    Paid,
    /// Packed for dispatch.
    Packed,
    /// Handed to the carrier.
    Shipped,
    /// Rental in progress.
    ActiveRent,
    /// Rental returned.
    Returned,
    /// Payment refunded.
    Refunded,
    /// Cancelled before fulfilment.
    Canceled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Paid,
        Self::Packed,
        Self::Shipped,
        Self::ActiveRent,
        Self::Returned,
        Self::Refunded,
        Self::Canceled,
    ];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Packed => "PACKED",
            Self::Shipped => "SHIPPED",
            Self::ActiveRent => "ACTIVE_RENT",
            Self::Returned => "RETURNED",
            Self::Refunded => "REFUNDED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown order status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{input}'")]
pub struct ParseOrderStatusError {
    /// Rejected input.
    pub input: String,
}

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ParseOrderStatusError {
                input: s.to_owned(),
            })
    }
}

/// External payment reference; at most one order exists per reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

/// Validation errors for [`PaymentReference`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentReferenceError {
    /// The reference was blank.
    #[error("payment reference must not be empty")]
    Empty,
}

impl PaymentReference {
    /// Validate a reference issued by the payment provider.
    ///
    /// # Errors
    /// Returns [`PaymentReferenceError::Empty`] for blank input.
    pub fn new(raw: impl Into<String>) -> Result<Self, PaymentReferenceError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PaymentReferenceError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Reference for a checkout completed without a payment provider.
    #[must_use]
    pub fn simulated() -> Self {
        Self(format!("sim_{}", Uuid::new_v4().simple()))
    }

    /// Whether the reference was minted for a simulated checkout.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.0.starts_with("sim_")
    }
}

impl AsRef<str> for PaymentReference {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PaymentReference> for String {
    fn from(value: PaymentReference) -> Self {
        value.0
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = PaymentReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Order line with its captured price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Referenced product.
    #[schema(value_type = String)]
    pub product_id: ProductId,
    /// Quantity.
    pub qty: u32,
    /// Purchase kind.
    pub kind: LineKind,
    /// Unit price captured at checkout.
    pub price_cents: i64,
    /// Current product details, when the product still exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSummary>,
}

/// Stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Identifier.
    #[schema(value_type = String)]
    pub id: OrderId,
    /// Owner.
    #[serde(skip)]
    pub user_id: UserId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Amount charged.
    pub total_cents: i64,
    /// Discount applied.
    pub discount_cents: i64,
    /// Payment reference the order was created for.
    #[schema(value_type = String)]
    pub payment_reference: PaymentReference,
    /// Lines with captured prices.
    pub items: Vec<OrderItem>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the captured line amounts.
    #[must_use]
    pub fn subtotal_cents(&self) -> i64 {
        self.total_cents + self.discount_cents
    }
}

/// Line of an order about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    /// Referenced product.
    pub product_id: ProductId,
    /// Quantity.
    pub qty: u32,
    /// Purchase kind.
    pub kind: LineKind,
    /// Captured unit price.
    pub price_cents: i64,
}

/// Validation errors for [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderValidationError {
    /// No lines were supplied.
    #[error("an order needs at least one item")]
    NoItems,
    /// The supplied totals disagree with the line amounts.
    #[error("order totals do not match its items")]
    TotalsMismatch,
    /// The line amounts could not be priced.
    #[error(transparent)]
    Pricing(#[from] super::pricing::PricingError),
}

/// Validated order ready to be persisted.
///
/// ## Invariants
/// - at least one item;
/// - `total_cents == Σ(qty × price_cents) − discount_cents`;
/// - `0 ≤ discount_cents ≤ subtotal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    user_id: UserId,
    payment_reference: PaymentReference,
    items: Vec<NewOrderItem>,
    totals: Totals,
}

impl NewOrder {
    /// Validate an order against its totals.
    ///
    /// # Errors
    /// Returns [`OrderValidationError`] when the invariants do not hold.
    pub fn new(
        user_id: UserId,
        payment_reference: PaymentReference,
        items: Vec<NewOrderItem>,
        totals: Totals,
    ) -> Result<Self, OrderValidationError> {
        if items.is_empty() {
            return Err(OrderValidationError::NoItems);
        }
        let recomputed = compute_totals(
            items
                .iter()
                .map(|item| LineAmount::new(item.price_cents, item.qty)),
        )?;
        let consistent = Totals::with_discount(recomputed.subtotal_cents, totals.discount_cents)
            .is_some_and(|expected| expected == totals);
        if !consistent {
            return Err(OrderValidationError::TotalsMismatch);
        }
        Ok(Self {
            user_id,
            payment_reference,
            items,
            totals,
        })
    }

    /// Owner.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Payment reference.
    #[must_use]
    pub const fn payment_reference(&self) -> &PaymentReference {
        &self.payment_reference
    }

    /// Lines.
    #[must_use]
    pub fn items(&self) -> &[NewOrderItem] {
        &self.items
    }

    /// Totals.
    #[must_use]
    pub const fn totals(&self) -> Totals {
        self.totals
    }
}
