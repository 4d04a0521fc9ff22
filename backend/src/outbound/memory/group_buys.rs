//! Group-buys held in memory.
//!
//! Join and claim both run under the store lock, which gives the same
//! ordering guarantee as the row lock used by the SQL adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{GroupBuyRepository, GroupBuyRepositoryError};
use crate::domain::{
    GroupBuy, GroupBuyDetail, GroupBuyDraft, GroupBuyId, GroupBuyParticipant, GroupBuyStatus,
    JoinOutcome, ProductId, UserId,
};

use super::{MemoryStore, StoredGroupBuy};

fn is_settleable(stored: &StoredGroupBuy, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> bool {
    match stored.group_buy.status {
        GroupBuyStatus::Open => stored.group_buy.deadline <= now,
        GroupBuyStatus::Settling => stored
            .settlement_started_at
            .is_some_and(|started| started < stale_before),
        GroupBuyStatus::Success | GroupBuyStatus::Failed => false,
    }
}

fn snapshot(stored: &StoredGroupBuy) -> GroupBuy {
    GroupBuy {
        participant_count: u32::try_from(stored.participants.len()).unwrap_or(u32::MAX),
        ..stored.group_buy.clone()
    }
}

#[async_trait]
impl GroupBuyRepository for MemoryStore {
    async fn create(
        &self,
        draft: &GroupBuyDraft,
        now: DateTime<Utc>,
    ) -> Result<GroupBuy, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            if !state
                .products
                .iter()
                .any(|product| product.id == draft.product_id)
            {
                return Err(GroupBuyRepositoryError::unknown_product(
                    draft.product_id.to_string(),
                ));
            }
            let group_buy = GroupBuy {
                id: GroupBuyId::random(),
                product_id: draft.product_id.clone(),
                creator_id: draft.creator_id.clone(),
                min_participants: draft.min_participants,
                deadline: draft.deadline,
                status: GroupBuyStatus::Open,
                participant_count: 0,
                created_at: now,
                settled_at: None,
            };
            state.group_buys.insert(
                group_buy.id.clone(),
                StoredGroupBuy {
                    group_buy: group_buy.clone(),
                    settlement_started_at: None,
                    participants: Vec::new(),
                },
            );
            Ok(group_buy)
        })
    }

    async fn find(&self, id: &GroupBuyId) -> Result<Option<GroupBuyDetail>, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            Ok(state.group_buys.get(id).map(|stored| GroupBuyDetail {
                group_buy: snapshot(stored),
                participants: stored.participants.clone(),
            }))
        })
    }

    async fn join(
        &self,
        id: &GroupBuyId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            let Some(stored) = state.group_buys.get_mut(id) else {
                return Ok(JoinOutcome::NotFound);
            };
            if stored.group_buy.status != GroupBuyStatus::Open || stored.group_buy.deadline <= now {
                return Ok(JoinOutcome::Closed);
            }
            if stored
                .participants
                .iter()
                .any(|participant| &participant.user_id == user_id)
            {
                return Ok(JoinOutcome::AlreadyJoined);
            }
            stored.participants.push(GroupBuyParticipant {
                user_id: user_id.clone(),
                intent: true,
                joined_at: now,
            });
            Ok(JoinOutcome::Joined)
        })
    }

    async fn list_open(
        &self,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupBuy>, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            let mut open: Vec<GroupBuy> = state
                .group_buys
                .values()
                .filter(|stored| {
                    &stored.group_buy.product_id == product_id
                        && stored.group_buy.status == GroupBuyStatus::Open
                        && stored.group_buy.deadline > now
                })
                .map(snapshot)
                .collect();
            open.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
            Ok(open)
        })
    }

    async fn list_settleable(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<GroupBuyId>, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            let mut candidates: Vec<&StoredGroupBuy> = state
                .group_buys
                .values()
                .filter(|stored| is_settleable(stored, now, stale_before))
                .collect();
            candidates.sort_by(|a, b| {
                a.group_buy
                    .deadline
                    .cmp(&b.group_buy.deadline)
                    .then_with(|| a.group_buy.id.cmp(&b.group_buy.id))
            });
            Ok(candidates
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .map(|stored| stored.group_buy.id.clone())
                .collect())
        })
    }

    async fn try_claim(
        &self,
        id: &GroupBuyId,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<GroupBuy>, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            let Some(stored) = state.group_buys.get_mut(id) else {
                return Ok(None);
            };
            if !is_settleable(stored, now, stale_before) {
                return Ok(None);
            }
            stored.group_buy.status = GroupBuyStatus::Settling;
            stored.settlement_started_at = Some(now);
            Ok(Some(snapshot(stored)))
        })
    }

    async fn participants(
        &self,
        id: &GroupBuyId,
    ) -> Result<Vec<GroupBuyParticipant>, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            Ok(state
                .group_buys
                .get(id)
                .map(|stored| stored.participants.clone())
                .unwrap_or_default())
        })
    }

    async fn finish(
        &self,
        id: &GroupBuyId,
        status: GroupBuyStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, GroupBuyRepositoryError> {
        self.with_state(GroupBuyRepositoryError::connection, |state| {
            let Some(stored) = state.group_buys.get_mut(id) else {
                return Ok(false);
            };
            if stored.group_buy.status != GroupBuyStatus::Settling {
                return Ok(false);
            }
            stored.group_buy.status = status;
            stored.group_buy.settled_at = Some(now);
            Ok(true)
        })
    }
}
