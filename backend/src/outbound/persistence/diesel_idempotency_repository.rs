//! Idempotency records in the `idempotency_keys` table.
//!
//! Lookups ignore age; the server's purge task calls `cleanup_expired` every
//! hour. The primary key `(key, user_id, mutation_type)` settles races between
//! concurrent first requests: the losing insert surfaces as
//! [`IdempotencyRepositoryError::DuplicateKey`].

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{IdempotencyRepository, IdempotencyRepositoryError};
use crate::domain::{
    IdempotencyKey, IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord,
    MutationType, PayloadHash, UserId,
};

use super::diesel_error_mapping::{DieselFailure, pool_error_message, rows_affected};
use super::models::{IdempotencyKeyRow, NewIdempotencyKeyRow};
use super::pool::{DbPool, PoolError};
use super::schema::idempotency_keys;

/// Diesel-backed implementation of the `IdempotencyRepository` port.
#[derive(Clone)]
pub struct DieselIdempotencyRepository {
    pool: DbPool,
}

impl DieselIdempotencyRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> IdempotencyRepositoryError {
    IdempotencyRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> IdempotencyRepositoryError {
    match DieselFailure::from(error) {
        DieselFailure::UniqueViolation { .. } => {
            IdempotencyRepositoryError::duplicate_key("concurrent insert detected")
        }
        DieselFailure::Connection => {
            IdempotencyRepositoryError::connection("database connection error")
        }
        DieselFailure::ForeignKeyViolation { .. } => {
            IdempotencyRepositoryError::query("idempotency key references an unknown user")
        }
        DieselFailure::Query { message } => IdempotencyRepositoryError::query(message),
    }
}

fn row_to_record(row: IdempotencyKeyRow) -> Result<IdempotencyRecord, IdempotencyRepositoryError> {
    let payload_hash = PayloadHash::try_from_bytes(&row.payload_hash).map_err(|err| {
        IdempotencyRepositoryError::query(format!("corrupted payload hash in database: {err}"))
    })?;
    let mutation_type = MutationType::from_str(&row.mutation_type).map_err(|err| {
        IdempotencyRepositoryError::query(format!("invalid mutation type in database: {err}"))
    })?;

    Ok(IdempotencyRecord {
        key: IdempotencyKey::from_uuid(row.key),
        mutation_type,
        payload_hash,
        response_snapshot: row.response_snapshot,
        user_id: UserId::from_uuid(row.user_id),
        created_at: row.created_at,
    })
}

fn classify(record: IdempotencyRecord, payload_hash: &PayloadHash) -> IdempotencyLookupResult {
    if record.payload_hash == *payload_hash {
        IdempotencyLookupResult::MatchingPayload(record)
    } else {
        IdempotencyLookupResult::ConflictingPayload(record)
    }
}

#[async_trait]
impl IdempotencyRepository for DieselIdempotencyRepository {
    async fn lookup(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result: Option<IdempotencyKeyRow> = idempotency_keys::table
            .filter(
                idempotency_keys::key
                    .eq(query.key.as_uuid())
                    .and(idempotency_keys::user_id.eq(query.user_id.as_uuid()))
                    .and(idempotency_keys::mutation_type.eq(query.mutation_type.as_str())),
            )
            .select(IdempotencyKeyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        match result {
            None => Ok(IdempotencyLookupResult::NotFound),
            Some(row) => Ok(classify(row_to_record(row)?, &query.payload_hash)),
        }
    }

    async fn store_in_progress(
        &self,
        record: &IdempotencyRecord,
    ) -> Result<(), IdempotencyRepositoryError> {
        let new_record = NewIdempotencyKeyRow {
            key: *record.key.as_uuid(),
            user_id: *record.user_id.as_uuid(),
            mutation_type: record.mutation_type.as_str(),
            payload_hash: record.payload_hash.as_bytes(),
            response_snapshot: &record.response_snapshot,
            created_at: record.created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(idempotency_keys::table)
            .values(&new_record)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_response_snapshot(
        &self,
        query: &IdempotencyLookupQuery,
        response_snapshot: &serde_json::Value,
    ) -> Result<(), IdempotencyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            idempotency_keys::table
                .filter(idempotency_keys::key.eq(query.key.as_uuid()))
                .filter(idempotency_keys::user_id.eq(query.user_id.as_uuid()))
                .filter(idempotency_keys::mutation_type.eq(query.mutation_type.as_str())),
        )
        .set(idempotency_keys::response_snapshot.eq(response_snapshot))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(IdempotencyRepositoryError::query(
                "idempotency claim vanished before completion",
            ));
        }
        Ok(())
    }

    async fn release(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<(), IdempotencyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(
            idempotency_keys::table
                .filter(idempotency_keys::key.eq(query.key.as_uuid()))
                .filter(idempotency_keys::user_id.eq(query.user_id.as_uuid()))
                .filter(idempotency_keys::mutation_type.eq(query.mutation_type.as_str())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        debug!(key = %query.key, deleted, "released idempotency claim");
        Ok(())
    }

    async fn cleanup_expired(&self, ttl: Duration) -> Result<u64, IdempotencyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl).map_err(|err| {
                IdempotencyRepositoryError::query(format!("invalid TTL duration: {err}"))
            })?;

        let deleted = diesel::delete(idempotency_keys::table)
            .filter(idempotency_keys::created_at.lt(cutoff))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(deleted, cutoff = %cutoff, "cleaned up expired idempotency records");
        Ok(rows_affected(deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::canonicalize_and_hash;
    use crate::test_support::clock::fixture_now;
    use rstest::rstest;
    use serde_json::json;
    use uuid::Uuid;

    fn stored_row(hash: &PayloadHash) -> IdempotencyKeyRow {
        IdempotencyKeyRow {
            key: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            mutation_type: MutationType::CartItems.as_str().to_owned(),
            payload_hash: hash.as_bytes().to_vec(),
            response_snapshot: json!({"status": 200}),
            created_at: fixture_now(),
        }
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));

        assert!(matches!(
            repo_err,
            IdempotencyRepositoryError::Connection { .. }
        ));
        assert!(repo_err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn unique_violation_maps_to_duplicate_key() {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        let repo_err = map_diesel_error(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        ));

        assert!(
            matches!(repo_err, IdempotencyRepositoryError::DuplicateKey { .. }),
            "expected DuplicateKey error, got {repo_err:?}"
        );
    }

    #[rstest]
    fn rows_with_matching_hashes_replay() {
        let hash = canonicalize_and_hash(&json!({"qty": 1})).expect("hashable payload");
        let record = row_to_record(stored_row(&hash)).expect("valid row");

        assert!(matches!(
            classify(record, &hash),
            IdempotencyLookupResult::MatchingPayload(_)
        ));
    }

    #[rstest]
    fn rows_with_other_hashes_conflict() {
        let stored = canonicalize_and_hash(&json!({"qty": 1})).expect("hashable payload");
        let incoming = canonicalize_and_hash(&json!({"qty": 2})).expect("hashable payload");
        let record = row_to_record(stored_row(&stored)).expect("valid row");

        assert!(matches!(
            classify(record, &incoming),
            IdempotencyLookupResult::ConflictingPayload(_)
        ));
    }

    #[rstest]
    fn truncated_hashes_are_query_errors() {
        let hash = canonicalize_and_hash(&json!({})).expect("hashable payload");
        let mut row = stored_row(&hash);
        row.payload_hash.truncate(8);

        let error = row_to_record(row).expect_err("short hash");
        assert!(matches!(error, IdempotencyRepositoryError::Query { .. }));
    }
}
