//! Driving ports for group-buy commitments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AuthContext, Error, GroupBuy, GroupBuyDetail, GroupBuyId, IdempotencyKey, ProductId,
};

/// Request to open a group-buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGroupBuyRequest {
    /// Creator.
    pub auth: AuthContext,
    /// Product.
    pub product_id: ProductId,
    /// Participants needed; must be positive.
    pub min_participants: i64,
    /// Joins close at this instant; must be in the future.
    pub deadline: DateTime<Utc>,
    /// Optional retry key.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Acknowledgement of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinReceipt {
    /// Always `true`; joins are idempotent.
    pub ok: bool,
    /// Whether the caller had already joined.
    pub already_joined: bool,
}

/// Domain use-case port for group-buy mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupBuyCommand: Send + Sync {
    /// Open a group-buy for an existing product.
    async fn create(&self, request: CreateGroupBuyRequest) -> Result<GroupBuy, Error>;

    /// Register the caller's intent to buy.
    async fn join(&self, auth: &AuthContext, id: &GroupBuyId) -> Result<JoinReceipt, Error>;
}

/// Domain use-case port for group-buy reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupBuyQuery: Send + Sync {
    /// OPEN, unexpired group-buys for a product, soonest deadline first.
    async fn list_open(&self, product_id: &ProductId) -> Result<Vec<GroupBuy>, Error>;

    /// Group-buy with participants.
    async fn get(&self, id: &GroupBuyId) -> Result<GroupBuyDetail, Error>;
}
