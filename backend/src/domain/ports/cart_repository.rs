//! Port for cart line persistence.
//!
//! Every operation is scoped to the owning user; a line belonging to another
//! user behaves exactly like a missing one.

use async_trait::async_trait;

use crate::domain::{CartItem, CartItemId, CartLine, NewCartItem, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by cart persistence adapters.
    pub enum CartRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "cart repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "cart repository query failed: {message}",
        /// The referenced product does not exist.
        UnknownProduct { message: String } => "cart line references an unknown product: {message}",
    }
}

/// Cart line storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Lines of a user joined with their products, oldest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CartLine>, CartRepositoryError>;

    /// Insert one line.
    async fn insert(&self, item: &NewCartItem) -> Result<CartItem, CartRepositoryError>;

    /// Insert lines, skipping any whose hold token already exists.
    ///
    /// Returns the number of lines actually inserted.
    async fn insert_many(&self, items: &[NewCartItem]) -> Result<u64, CartRepositoryError>;

    /// Change the quantity of a line; `None` when the user has no such line.
    async fn update_qty(
        &self,
        user_id: &UserId,
        item_id: &CartItemId,
        qty: u32,
    ) -> Result<Option<CartItem>, CartRepositoryError>;

    /// Delete one line; `false` when the user has no such line.
    async fn delete(
        &self,
        user_id: &UserId,
        item_id: &CartItemId,
    ) -> Result<bool, CartRepositoryError>;

    /// Delete the listed lines of a user, returning how many were removed.
    async fn delete_many(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, CartRepositoryError>;

    /// Delete every line of a user, returning how many were removed.
    async fn clear(&self, user_id: &UserId) -> Result<u64, CartRepositoryError>;
}
