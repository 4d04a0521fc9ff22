//! Port for order persistence.
//!
//! Orders are written once with their items in a single transaction. The
//! payment reference is unique, which is what makes confirmation idempotent.

use async_trait::async_trait;

use crate::domain::{NewOrder, Order, OrderId, PaymentReference, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by order persistence adapters.
    pub enum OrderRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "order repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "order repository query failed: {message}",
        /// An order already exists for the payment reference.
        DuplicateReference { reference: String } => "an order already exists for payment reference {reference}",
    }
}

/// Order storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Write an order with status PAID and its items atomically.
    ///
    /// Fails with [`OrderRepositoryError::DuplicateReference`] when the
    /// payment reference is already taken.
    async fn create(&self, order: &NewOrder) -> Result<OrderId, OrderRepositoryError>;

    /// Order created for a payment reference.
    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<OrderId>, OrderRepositoryError>;

    /// Order with items and product summaries, regardless of owner.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderRepositoryError>;

    /// Order with items, only when owned by `user_id`.
    async fn find_for_user(
        &self,
        user_id: &UserId,
        id: &OrderId,
    ) -> Result<Option<Order>, OrderRepositoryError>;

    /// Orders of a user, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, OrderRepositoryError>;
}
