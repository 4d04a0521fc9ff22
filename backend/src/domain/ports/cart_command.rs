//! Driving ports for cart mutations and reads.

use async_trait::async_trait;

use crate::domain::{
    AuthContext, CartItem, CartItemId, CartLine, Error, IdempotencyKey, LineKind, ProductId,
    RentalWindow,
};

/// Request to add a line to the caller's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCartItemRequest {
    /// Caller.
    pub auth: AuthContext,
    /// Product to add.
    pub product_id: ProductId,
    /// Quantity, at least one.
    pub qty: u32,
    /// Purchase kind.
    pub kind: LineKind,
    /// Optional rental window.
    pub window: RentalWindow,
    /// Optional retry key.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Result of changing a line's quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// The line now carries the new quantity.
    Updated(CartItem),
    /// Quantity zero removed the line.
    Deleted,
}

/// Domain use-case port for cart mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartCommand: Send + Sync {
    /// Add a new line with a fresh hold token.
    async fn add_item(&self, request: AddCartItemRequest) -> Result<CartItem, Error>;

    /// Set a line's quantity; zero deletes it.
    async fn set_qty(
        &self,
        auth: &AuthContext,
        item_id: &CartItemId,
        qty: u32,
    ) -> Result<QuantityUpdate, Error>;

    /// Remove one line.
    async fn remove_item(&self, auth: &AuthContext, item_id: &CartItemId) -> Result<(), Error>;

    /// Remove every line, returning how many were removed.
    async fn clear(&self, auth: &AuthContext) -> Result<u64, Error>;
}

/// Domain use-case port for reading the cart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartQuery: Send + Sync {
    /// Lines with product summaries, oldest first.
    async fn list_items(&self, auth: &AuthContext) -> Result<Vec<CartLine>, Error>;
}
