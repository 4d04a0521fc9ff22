//! Port for group-buy persistence and the settlement state transitions.
//!
//! Joins and the OPEN→SETTLING claim must serialise on the group-buy row:
//! once a claim wins, no further participant may appear. Adapters achieve
//! this with a row lock taken by `join` and a conditional update in
//! `try_claim`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    GroupBuy, GroupBuyDetail, GroupBuyDraft, GroupBuyId, GroupBuyParticipant, GroupBuyStatus,
    JoinOutcome, ProductId, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by group-buy persistence adapters.
    pub enum GroupBuyRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "group-buy repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "group-buy repository query failed: {message}",
        /// The referenced product does not exist.
        UnknownProduct { message: String } => "group-buy references an unknown product: {message}",
    }
}

/// Group-buy storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupBuyRepository: Send + Sync {
    /// Insert an OPEN group-buy.
    async fn create(
        &self,
        draft: &GroupBuyDraft,
        now: DateTime<Utc>,
    ) -> Result<GroupBuy, GroupBuyRepositoryError>;

    /// Group-buy with its participants in join order.
    async fn find(&self, id: &GroupBuyId) -> Result<Option<GroupBuyDetail>, GroupBuyRepositoryError>;

    /// Add `user_id` as a participant while the group-buy is OPEN and its
    /// deadline is after `now`.
    async fn join(
        &self,
        id: &GroupBuyId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, GroupBuyRepositoryError>;

    /// OPEN group-buys for a product whose deadline is after `now`, soonest
    /// deadline first.
    async fn list_open(
        &self,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupBuy>, GroupBuyRepositoryError>;

    /// Candidates for settlement: OPEN past their deadline, or SETTLING with a
    /// claim older than `stale_before`.
    async fn list_settleable(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<GroupBuyId>, GroupBuyRepositoryError>;

    /// Conditionally move a candidate to SETTLING, stamping the claim time.
    ///
    /// Returns `None` when another settlement run already holds the claim.
    async fn try_claim(
        &self,
        id: &GroupBuyId,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<GroupBuy>, GroupBuyRepositoryError>;

    /// Participants of a group-buy.
    async fn participants(
        &self,
        id: &GroupBuyId,
    ) -> Result<Vec<GroupBuyParticipant>, GroupBuyRepositoryError>;

    /// Conditionally move SETTLING to a terminal status.
    ///
    /// Returns `false` when the group-buy was not SETTLING.
    async fn finish(
        &self,
        id: &GroupBuyId,
        status: GroupBuyStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, GroupBuyRepositoryError>;
}
