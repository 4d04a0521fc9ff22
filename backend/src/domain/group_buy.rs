//! Group-buy commitments and their settlement rule.
//!
//! A group-buy is OPEN until its deadline. Settlement moves it through
//! SETTLING to SUCCESS or FAILED exactly once, guarded by a conditional
//! transition in storage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{GroupBuyId, ProductId, UserId};

/// Group-buy lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupBuyStatus {
    /// Accepting participants.
    Open,
    /// Claimed by a settlement run.
    Settling,
    /// Enough participants joined.
    Success,
    /// Too few participants joined.
    Failed,
}

impl GroupBuyStatus {
    /// All statuses.
    pub const ALL: [Self; 4] = [Self::Open, Self::Settling, Self::Success, Self::Failed];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Settling => "SETTLING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    /// Whether the status is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for GroupBuyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown group-buy status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown group-buy status '{input}'")]
pub struct ParseGroupBuyStatusError {
    /// Rejected input.
    pub input: String,
}

impl FromStr for GroupBuyStatus {
    type Err = ParseGroupBuyStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ParseGroupBuyStatusError {
                input: s.to_owned(),
            })
    }
}

/// Stored group-buy with its live participant count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuy {
    /// Identifier.
    #[schema(value_type = String)]
    pub id: GroupBuyId,
    /// Product the commitment is for.
    #[schema(value_type = String)]
    pub product_id: ProductId,
    /// User who opened the group-buy.
    #[schema(value_type = String)]
    pub creator_id: UserId,
    /// Participants needed for success.
    pub min_participants: u32,
    /// Joins close at this instant.
    pub deadline: DateTime<Utc>,
    /// Lifecycle status.
    pub status: GroupBuyStatus,
    /// Participants at read time.
    pub participant_count: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When settlement finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl GroupBuy {
    /// Whether a join at `now` is allowed.
    #[must_use]
    pub fn accepts_joins(&self, now: DateTime<Utc>) -> bool {
        self.status == GroupBuyStatus::Open && self.deadline > now
    }

    /// Whether settlement may start at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == GroupBuyStatus::Open && self.deadline <= now
    }
}

/// Participant of a group-buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuyParticipant {
    /// Participating user.
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// Intent to buy.
    pub intent: bool,
    /// Join time.
    pub joined_at: DateTime<Utc>,
}

/// Group-buy with its participant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuyDetail {
    /// The group-buy.
    #[serde(flatten)]
    pub group_buy: GroupBuy,
    /// Participants in join order.
    pub participants: Vec<GroupBuyParticipant>,
}

/// Validation errors for [`GroupBuyDraft`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupBuyValidationError {
    /// Minimum participants was zero or negative.
    #[error("minParticipants must be a positive integer")]
    NonPositiveMinimum,
    /// The deadline is not in the future.
    #[error("deadline must be in the future")]
    DeadlineNotInFuture,
}

/// Validated request to open a group-buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBuyDraft {
    /// Creator.
    pub creator_id: UserId,
    /// Product.
    pub product_id: ProductId,
    /// Participants needed.
    pub min_participants: u32,
    /// Deadline.
    pub deadline: DateTime<Utc>,
}

impl GroupBuyDraft {
    /// Validate a new group-buy against the current time.
    ///
    /// # Errors
    /// Returns [`GroupBuyValidationError`] for a non-positive minimum or a
    /// deadline at or before `now`.
    pub fn new(
        creator_id: UserId,
        product_id: ProductId,
        min_participants: i64,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, GroupBuyValidationError> {
        let min_participants = u32::try_from(min_participants)
            .ok()
            .filter(|min| *min > 0)
            .ok_or(GroupBuyValidationError::NonPositiveMinimum)?;
        if deadline <= now {
            return Err(GroupBuyValidationError::DeadlineNotInFuture);
        }
        Ok(Self {
            creator_id,
            product_id,
            min_participants,
            deadline,
        })
    }
}

/// Result of adding a participant in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A participant row was created.
    Joined,
    /// The user was already a participant.
    AlreadyJoined,
    /// The group-buy is not OPEN or its deadline passed.
    Closed,
    /// No such group-buy.
    NotFound,
}

/// Outcome decided for a settled group-buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementDecision {
    /// Enough participants.
    Success,
    /// Too few participants.
    Failed,
}

impl SettlementDecision {
    /// Apply the minimum-participants rule.
    #[must_use]
    pub const fn evaluate(participants: u32, min_participants: u32) -> Self {
        if participants >= min_participants {
            Self::Success
        } else {
            Self::Failed
        }
    }

    /// Terminal status recorded for the decision.
    #[must_use]
    pub const fn status(self) -> GroupBuyStatus {
        match self {
            Self::Success => GroupBuyStatus::Success,
            Self::Failed => GroupBuyStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn group_buy(status: GroupBuyStatus, deadline: DateTime<Utc>) -> GroupBuy {
        GroupBuy {
            id: GroupBuyId::random(),
            product_id: ProductId::random(),
            creator_id: UserId::random(),
            min_participants: 3,
            deadline,
            status,
            participant_count: 0,
            created_at: deadline - Duration::days(1),
            settled_at: None,
        }
    }

    #[rstest]
    #[case(GroupBuyStatus::Open, 1, true)]
    #[case(GroupBuyStatus::Open, 0, false)]
    #[case(GroupBuyStatus::Open, -1, false)]
    #[case(GroupBuyStatus::Settling, 1, false)]
    #[case(GroupBuyStatus::Success, 1, false)]
    fn joins_need_open_status_and_future_deadline(
        #[case] status: GroupBuyStatus,
        #[case] minutes_left: i64,
        #[case] expected: bool,
    ) {
        let now = Utc::now();
        let subject = group_buy(status, now + Duration::minutes(minutes_left));
        assert_eq!(subject.accepts_joins(now), expected);
    }

    #[rstest]
    fn due_once_deadline_reached() {
        let now = Utc::now();
        assert!(group_buy(GroupBuyStatus::Open, now).is_due(now));
        assert!(!group_buy(GroupBuyStatus::Failed, now).is_due(now));
    }

    #[rstest]
    #[case(2, 3, SettlementDecision::Failed)]
    #[case(3, 3, SettlementDecision::Success)]
    #[case(5, 3, SettlementDecision::Success)]
    #[case(0, 1, SettlementDecision::Failed)]
    fn settlement_compares_against_minimum(
        #[case] participants: u32,
        #[case] min: u32,
        #[case] expected: SettlementDecision,
    ) {
        assert_eq!(SettlementDecision::evaluate(participants, min), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    fn draft_rejects_non_positive_minimum(#[case] min: i64) {
        let now = Utc::now();
        let result = GroupBuyDraft::new(
            UserId::random(),
            ProductId::random(),
            min,
            now + Duration::hours(1),
            now,
        );
        assert_eq!(result, Err(GroupBuyValidationError::NonPositiveMinimum));
    }

    #[rstest]
    fn draft_rejects_past_deadline() {
        let now = Utc::now();
        let result = GroupBuyDraft::new(UserId::random(), ProductId::random(), 3, now, now);
        assert_eq!(result, Err(GroupBuyValidationError::DeadlineNotInFuture));
    }
}
