//! Checkout snapshots, payment metadata and confirmation outcomes.
//!
//! A checkout session freezes the priced cart at creation time. Confirmation
//! materialises exactly that snapshot, whatever happened to the live cart in
//! between.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::order::{NewOrder, NewOrderItem, OrderValidationError, PaymentReference};
use super::pricing::{LineAmount, PricingError, Totals, compute_totals};
use super::{CartItemId, CartLine, DEFAULT_CURRENCY, LineKind, OrderId, ProductId, UserId};

/// Errors raised while freezing a cart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,
    /// The cart could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Priced cart line frozen into a checkout snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLine {
    /// Source cart line, removed once the order exists.
    pub cart_item_id: CartItemId,
    /// Product bought.
    pub product_id: ProductId,
    /// Product title at checkout.
    pub title: String,
    /// First product image at checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Quantity.
    pub qty: u32,
    /// Purchase kind.
    pub kind: LineKind,
    /// Live unit price read at checkout.
    pub unit_price_cents: i64,
}

/// Priced cart frozen at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSnapshot {
    /// Cart owner.
    pub user_id: UserId,
    /// Priced lines.
    pub lines: Vec<SnapshotLine>,
    /// ISO currency code of the charge.
    pub currency: String,
    /// Computed totals.
    pub totals: Totals,
}

impl CheckoutSnapshot {
    /// Price the cart with the live product prices carried by each line.
    ///
    /// # Errors
    /// Returns [`CheckoutError::EmptyCart`] for an empty cart and
    /// [`CheckoutError::Pricing`] when the lines cannot be priced.
    pub fn price(user_id: UserId, lines: &[CartLine]) -> Result<Self, CheckoutError> {
        let Some(first) = lines.first() else {
            return Err(CheckoutError::EmptyCart);
        };
        let currency = if first.product.currency.trim().is_empty() {
            DEFAULT_CURRENCY.to_owned()
        } else {
            first.product.currency.clone()
        };
        let frozen: Vec<SnapshotLine> = lines
            .iter()
            .map(|line| SnapshotLine {
                cart_item_id: line.item.id.clone(),
                product_id: line.item.product_id.clone(),
                title: line.product.title.clone(),
                image: line.product.image.clone(),
                qty: line.item.qty,
                kind: line.item.kind,
                unit_price_cents: line.product.price_cents,
            })
            .collect();
        let totals = compute_totals(
            frozen
                .iter()
                .map(|line| LineAmount::new(line.unit_price_cents, line.qty)),
        )?;
        Ok(Self {
            user_id,
            lines: frozen,
            currency,
            totals,
        })
    }

    /// Cart lines captured by this snapshot.
    #[must_use]
    pub fn cart_item_ids(&self) -> Vec<CartItemId> {
        self.lines
            .iter()
            .map(|line| line.cart_item_id.clone())
            .collect()
    }

    /// Build the order this snapshot pays for.
    ///
    /// # Errors
    /// Returns [`OrderValidationError`] when `totals` disagree with the lines.
    pub fn to_new_order(
        &self,
        payment_reference: PaymentReference,
        totals: Totals,
    ) -> Result<NewOrder, OrderValidationError> {
        let items = self
            .lines
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id.clone(),
                qty: line.qty,
                kind: line.kind,
                price_cents: line.unit_price_cents,
            })
            .collect();
        NewOrder::new(self.user_id.clone(), payment_reference, items, totals)
    }
}

/// Lifecycle of a persisted checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutSessionStatus {
    /// Awaiting payment confirmation.
    Open,
    /// An order exists for the session.
    Completed,
}

impl CheckoutSessionStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Completed => "COMPLETED",
        }
    }
}

/// Persisted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Payment provider reference.
    pub reference: PaymentReference,
    /// Frozen cart.
    pub snapshot: CheckoutSnapshot,
    /// Lifecycle status.
    pub status: CheckoutSessionStatus,
    /// Order created for the session.
    pub order_id: Option<OrderId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Metadata key carrying the user id.
pub const METADATA_USER_ID: &str = "userId";
/// Metadata key carrying the sign-in identifier.
pub const METADATA_IDENTIFIER: &str = "headerUid";
/// Metadata key carrying the subtotal.
pub const METADATA_SUBTOTAL: &str = "subtotalCents";
/// Metadata key carrying the discount.
pub const METADATA_DISCOUNT: &str = "discountCents";

/// Opaque metadata attached to an external payment session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMetadata(BTreeMap<String, String>);

impl PaymentMetadata {
    /// Metadata describing who pays and which discount was charged.
    #[must_use]
    pub fn for_checkout(user_id: &UserId, identifier: Option<&str>, totals: Totals) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(METADATA_USER_ID.to_owned(), user_id.to_string());
        if let Some(identifier) = identifier {
            entries.insert(METADATA_IDENTIFIER.to_owned(), identifier.to_owned());
        }
        entries.insert(
            METADATA_SUBTOTAL.to_owned(),
            totals.subtotal_cents.to_string(),
        );
        entries.insert(
            METADATA_DISCOUNT.to_owned(),
            totals.discount_cents.to_string(),
        );
        Self(entries)
    }

    /// Wrap raw provider metadata.
    #[must_use]
    pub const fn from_map(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// Raw entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Embedded user id, when present and well formed.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.get(METADATA_USER_ID)
            .and_then(|raw| UserId::new(raw).ok())
    }

    /// Embedded sign-in identifier.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.get(METADATA_IDENTIFIER)
    }

    /// Discount the provider charged, when it parses as a non-negative integer.
    #[must_use]
    pub fn discount_cents(&self) -> Option<i64> {
        self.get(METADATA_DISCOUNT)
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|discount| *discount >= 0)
    }
}

/// Line item sent to the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLine {
    /// Product name.
    pub name: String,
    /// Product image.
    pub image: Option<String>,
    /// Unit amount in minor units.
    pub unit_amount_cents: i64,
    /// Quantity.
    pub qty: u32,
    /// Lower-case ISO currency code.
    pub currency: String,
}

/// Request to open a hosted payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSessionRequest {
    /// Lines to charge.
    pub lines: Vec<PaymentLine>,
    /// Opaque metadata echoed back on confirmation.
    pub metadata: PaymentMetadata,
    /// Redirect target after payment.
    pub success_url: String,
    /// Redirect target after abandonment.
    pub cancel_url: String,
}

impl PaymentSessionRequest {
    /// Build the provider request for a snapshot.
    #[must_use]
    pub fn from_snapshot(
        snapshot: &CheckoutSnapshot,
        metadata: PaymentMetadata,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        let currency = snapshot.currency.to_lowercase();
        let lines = snapshot
            .lines
            .iter()
            .map(|line| PaymentLine {
                name: line.title.clone(),
                image: line.image.clone(),
                unit_amount_cents: line.unit_price_cents,
                qty: line.qty,
                currency: currency.clone(),
            })
            .collect();
        Self {
            lines,
            metadata,
            success_url,
            cancel_url,
        }
    }
}

/// Hosted session opened by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    /// Provider reference.
    pub reference: PaymentReference,
    /// Where the shopper completes payment.
    pub redirect_url: String,
}

/// Payment status reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStatusReport {
    /// Provider reference.
    pub reference: PaymentReference,
    /// Whether the charge completed.
    pub paid: bool,
    /// Metadata attached at session creation.
    pub metadata: PaymentMetadata,
}

/// Kind of a verified provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    /// Checkout completed (possibly with payment still pending).
    SessionCompleted,
    /// A delayed payment method settled.
    AsyncPaymentSucceeded,
    /// Any other event type.
    Other(String),
}

/// Verified provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    /// Event kind.
    pub kind: PaymentEventKind,
    /// Session the event refers to, for checkout events.
    pub session: Option<PaymentStatusReport>,
}

/// Result of opening a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStart {
    /// Payment reference.
    #[schema(value_type = String)]
    pub reference: PaymentReference,
    /// Where to send the shopper next.
    pub redirect_url: String,
    /// Order created immediately when no payment provider is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub order_id: Option<OrderId>,
    /// Totals charged.
    pub totals: Totals,
}

/// Result of confirming a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// This call created the order.
    Fulfilled(OrderId),
    /// An earlier confirmation created the order.
    AlreadyProcessed(OrderId),
    /// Nothing could be finalised; the reason was logged.
    Ignored,
}

impl ConfirmationOutcome {
    /// Order created for the reference, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::Fulfilled(id) | Self::AlreadyProcessed(id) => Some(id),
            Self::Ignored => None,
        }
    }
}
