//! Driving ports for order reads, reorder and receipt resend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{AuthContext, Error, IdempotencyKey, Order, OrderId};

/// Request to copy a past order back into the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderRequest {
    /// Caller.
    pub auth: AuthContext,
    /// Order to copy.
    pub order_id: OrderId,
    /// Optional retry key.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Lines added by a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReorderOutcome {
    /// Number of cart lines created.
    pub added: u64,
}

/// Domain use-case port for order mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderCommand: Send + Sync {
    /// Copy the BUY lines of an order into the cart.
    async fn reorder(&self, request: ReorderRequest) -> Result<ReorderOutcome, Error>;

    /// Queue the confirmation receipt again.
    async fn resend_receipt(&self, auth: &AuthContext, order_id: &OrderId) -> Result<(), Error>;
}

/// Domain use-case port for order reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderQuery: Send + Sync {
    /// The caller's orders, newest first.
    async fn list_orders(&self, auth: &AuthContext) -> Result<Vec<Order>, Error>;

    /// One of the caller's orders.
    async fn get_order(&self, auth: &AuthContext, order_id: &OrderId) -> Result<Order, Error>;
}
