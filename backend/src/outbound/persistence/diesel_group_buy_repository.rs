//! PostgreSQL-backed `GroupBuyRepository` implementation using Diesel ORM.
//!
//! Joins lock the group-buy row (`SELECT ... FOR UPDATE`) before checking its
//! status and inserting the participant. The settlement claim is a single
//! conditional `UPDATE`, so it either waits for an in-flight join to commit
//! or makes every later join see a non-OPEN status.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{GroupBuyRepository, GroupBuyRepositoryError};
use crate::domain::{
    GroupBuy, GroupBuyDetail, GroupBuyDraft, GroupBuyId, GroupBuyParticipant, GroupBuyStatus,
    JoinOutcome, ProductId, UserId,
};

use super::diesel_error_mapping::{DieselFailure, pool_error_message};
use super::models::{GroupBuyRow, NewGroupBuyRow, NewParticipantRow, ParticipantRow};
use super::pool::{DbPool, PoolError};
use super::schema::{group_buy_participants, group_buys};

/// Diesel-backed group-buy storage.
#[derive(Clone)]
pub struct DieselGroupBuyRepository {
    pool: DbPool,
}

impl DieselGroupBuyRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> GroupBuyRepositoryError {
    GroupBuyRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> GroupBuyRepositoryError {
    match DieselFailure::from(error) {
        DieselFailure::ForeignKeyViolation { constraint } => {
            GroupBuyRepositoryError::unknown_product(constraint.unwrap_or_default())
        }
        DieselFailure::UniqueViolation { .. } => {
            GroupBuyRepositoryError::query("unique constraint violated")
        }
        DieselFailure::Connection => {
            GroupBuyRepositoryError::connection("database connection error")
        }
        DieselFailure::Query { message } => GroupBuyRepositoryError::query(message),
    }
}

fn to_count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn to_group_buy(row: &GroupBuyRow, participant_count: u32) -> Result<GroupBuy, GroupBuyRepositoryError> {
    let status = GroupBuyStatus::from_str(&row.status).map_err(|err| {
        GroupBuyRepositoryError::query(format!("invalid group-buy status in database: {err}"))
    })?;
    Ok(GroupBuy {
        id: GroupBuyId::from_uuid(row.id),
        product_id: ProductId::from_uuid(row.product_id),
        creator_id: UserId::from_uuid(row.creator_id),
        min_participants: u32::try_from(row.min_participants).unwrap_or(0),
        deadline: row.deadline,
        status,
        participant_count,
        created_at: row.created_at,
        settled_at: row.settled_at,
    })
}

fn to_participant(row: &ParticipantRow) -> GroupBuyParticipant {
    GroupBuyParticipant {
        user_id: UserId::from_uuid(row.user_id),
        intent: row.intent,
        joined_at: row.joined_at,
    }
}

async fn participant_counts(
    conn: &mut AsyncPgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, u32>, GroupBuyRepositoryError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let counts: Vec<(Uuid, i64)> = group_buy_participants::table
        .filter(group_buy_participants::group_buy_id.eq_any(ids))
        .group_by(group_buy_participants::group_buy_id)
        .select((group_buy_participants::group_buy_id, count_star()))
        .load(conn)
        .await
        .map_err(map_diesel_error)?;
    Ok(counts
        .into_iter()
        .map(|(id, count)| (id, to_count(count)))
        .collect())
}

async fn with_count(
    conn: &mut AsyncPgConnection,
    row: &GroupBuyRow,
) -> Result<GroupBuy, GroupBuyRepositoryError> {
    let counts = participant_counts(conn, &[row.id]).await?;
    let count = counts.get(&row.id).copied().unwrap_or(0);
    to_group_buy(row, count)
}

#[async_trait]
impl GroupBuyRepository for DieselGroupBuyRepository {
    async fn create(
        &self,
        draft: &GroupBuyDraft,
        now: DateTime<Utc>,
    ) -> Result<GroupBuy, GroupBuyRepositoryError> {
        let new_row = NewGroupBuyRow {
            id: Uuid::new_v4(),
            product_id: *draft.product_id.as_uuid(),
            creator_id: *draft.creator_id.as_uuid(),
            min_participants: i32::try_from(draft.min_participants)
                .map_err(|_| GroupBuyRepositoryError::query("minimum participants out of range"))?,
            deadline: draft.deadline,
            status: GroupBuyStatus::Open.as_str(),
            created_at: now,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: GroupBuyRow = diesel::insert_into(group_buys::table)
            .values(&new_row)
            .returning(GroupBuyRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_group_buy(&row, 0)
    }

    async fn find(&self, id: &GroupBuyId) -> Result<Option<GroupBuyDetail>, GroupBuyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let Some(row) = group_buys::table
            .find(id.as_uuid())
            .select(GroupBuyRow::as_select())
            .first::<GroupBuyRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };
        let participants: Vec<GroupBuyParticipant> = group_buy_participants::table
            .filter(group_buy_participants::group_buy_id.eq(id.as_uuid()))
            .order((
                group_buy_participants::joined_at.asc(),
                group_buy_participants::user_id.asc(),
            ))
            .select(ParticipantRow::as_select())
            .load::<ParticipantRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .iter()
            .map(to_participant)
            .collect();
        let count = u32::try_from(participants.len()).unwrap_or(u32::MAX);
        Ok(Some(GroupBuyDetail {
            group_buy: to_group_buy(&row, count)?,
            participants,
        }))
    }

    async fn join(
        &self,
        id: &GroupBuyId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome, GroupBuyRepositoryError> {
        let group_buy_id = *id.as_uuid();
        let participant = NewParticipantRow {
            group_buy_id,
            user_id: *user_id.as_uuid(),
            intent: true,
            joined_at: now,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                let locked: Option<(String, DateTime<Utc>)> = group_buys::table
                    .find(group_buy_id)
                    .select((group_buys::status, group_buys::deadline))
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                let Some((status, deadline)) = locked else {
                    return Ok(JoinOutcome::NotFound);
                };
                if status != GroupBuyStatus::Open.as_str() || deadline <= now {
                    return Ok(JoinOutcome::Closed);
                }
                let inserted = diesel::insert_into(group_buy_participants::table)
                    .values(&participant)
                    .on_conflict((
                        group_buy_participants::group_buy_id,
                        group_buy_participants::user_id,
                    ))
                    .do_nothing()
                    .execute(conn)
                    .await?;
                if inserted == 0 {
                    Ok(JoinOutcome::AlreadyJoined)
                } else {
                    Ok::<JoinOutcome, diesel::result::Error>(JoinOutcome::Joined)
                }
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn list_open(
        &self,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupBuy>, GroupBuyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<GroupBuyRow> = group_buys::table
            .filter(group_buys::product_id.eq(product_id.as_uuid()))
            .filter(group_buys::status.eq(GroupBuyStatus::Open.as_str()))
            .filter(group_buys::deadline.gt(now))
            .order((group_buys::deadline.asc(), group_buys::id.asc()))
            .select(GroupBuyRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let counts = participant_counts(&mut conn, &ids).await?;
        rows.iter()
            .map(|row| {
                let count = counts.get(&row.id).copied().unwrap_or(0);
                to_group_buy(row, count)
            })
            .collect()
    }

    async fn list_settleable(
        &self,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<GroupBuyId>, GroupBuyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<Uuid> = group_buys::table
            .filter(
                group_buys::status
                    .eq(GroupBuyStatus::Open.as_str())
                    .and(group_buys::deadline.le(now))
                    .or(group_buys::status
                        .eq(GroupBuyStatus::Settling.as_str())
                        .and(group_buys::settlement_started_at.lt(stale_before))),
            )
            .order((group_buys::deadline.asc(), group_buys::id.asc()))
            .limit(i64::from(limit))
            .select(group_buys::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(GroupBuyId::from_uuid).collect())
    }

    async fn try_claim(
        &self,
        id: &GroupBuyId,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<GroupBuy>, GroupBuyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let claimed: Option<GroupBuyRow> = diesel::update(
            group_buys::table.filter(group_buys::id.eq(id.as_uuid())).filter(
                group_buys::status
                    .eq(GroupBuyStatus::Open.as_str())
                    .and(group_buys::deadline.le(now))
                    .or(group_buys::status
                        .eq(GroupBuyStatus::Settling.as_str())
                        .and(group_buys::settlement_started_at.lt(stale_before))),
            ),
        )
        .set((
            group_buys::status.eq(GroupBuyStatus::Settling.as_str()),
            group_buys::settlement_started_at.eq(Some(now)),
        ))
        .returning(GroupBuyRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        match claimed {
            Some(row) => with_count(&mut conn, &row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn participants(
        &self,
        id: &GroupBuyId,
    ) -> Result<Vec<GroupBuyParticipant>, GroupBuyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ParticipantRow> = group_buy_participants::table
            .filter(group_buy_participants::group_buy_id.eq(id.as_uuid()))
            .order((
                group_buy_participants::joined_at.asc(),
                group_buy_participants::user_id.asc(),
            ))
            .select(ParticipantRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.iter().map(to_participant).collect())
    }

    async fn finish(
        &self,
        id: &GroupBuyId,
        status: GroupBuyStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, GroupBuyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            group_buys::table
                .filter(group_buys::id.eq(id.as_uuid()))
                .filter(group_buys::status.eq(GroupBuyStatus::Settling.as_str())),
        )
        .set((
            group_buys::status.eq(status.as_str()),
            group_buys::settled_at.eq(Some(now)),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for group-buy row conversion.
    use super::*;
    use crate::test_support::clock::fixture_now;
    use rstest::rstest;

    fn row(status: &str) -> GroupBuyRow {
        GroupBuyRow {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            min_participants: 3,
            deadline: fixture_now(),
            status: status.to_owned(),
            settled_at: None,
            created_at: fixture_now(),
        }
    }

    #[rstest]
    #[case("OPEN", GroupBuyStatus::Open)]
    #[case("SETTLING", GroupBuyStatus::Settling)]
    #[case("SUCCESS", GroupBuyStatus::Success)]
    #[case("FAILED", GroupBuyStatus::Failed)]
    fn stored_statuses_are_decoded(#[case] raw: &str, #[case] expected: GroupBuyStatus) {
        let group_buy = to_group_buy(&row(raw), 2).expect("valid row");
        assert_eq!(group_buy.status, expected);
        assert_eq!(group_buy.participant_count, 2);
    }

    #[rstest]
    fn unknown_statuses_are_query_errors() {
        let error = to_group_buy(&row("PAUSED"), 0).expect_err("invalid status");
        assert!(matches!(error, GroupBuyRepositoryError::Query { .. }));
    }

    #[rstest]
    fn oversized_counts_saturate() {
        assert_eq!(to_count(i64::MAX), u32::MAX);
        assert_eq!(to_count(4), 4);
    }
}
