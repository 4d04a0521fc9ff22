//! Idempotency records held in memory.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{IdempotencyRepository, IdempotencyRepositoryError};
use crate::domain::{IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord};

use super::{IdempotencyScope, MemoryStore};

fn scope_of(query: &IdempotencyLookupQuery) -> IdempotencyScope {
    (
        *query.key.as_uuid(),
        query.user_id.clone(),
        query.mutation_type,
    )
}

#[async_trait]
impl IdempotencyRepository for MemoryStore {
    async fn lookup(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError> {
        self.with_state(IdempotencyRepositoryError::connection, |state| {
            Ok(match state.idempotency.get(&scope_of(query)) {
                None => IdempotencyLookupResult::NotFound,
                Some(record) if record.payload_hash == query.payload_hash => {
                    IdempotencyLookupResult::MatchingPayload(record.clone())
                }
                Some(record) => IdempotencyLookupResult::ConflictingPayload(record.clone()),
            })
        })
    }

    async fn store_in_progress(
        &self,
        record: &IdempotencyRecord,
    ) -> Result<(), IdempotencyRepositoryError> {
        let scope = (
            *record.key.as_uuid(),
            record.user_id.clone(),
            record.mutation_type,
        );
        self.with_state(IdempotencyRepositoryError::connection, |state| {
            if state.idempotency.contains_key(&scope) {
                return Err(IdempotencyRepositoryError::duplicate_key(
                    "concurrent insert detected",
                ));
            }
            state.idempotency.insert(scope, record.clone());
            Ok(())
        })
    }

    async fn update_response_snapshot(
        &self,
        query: &IdempotencyLookupQuery,
        response_snapshot: &serde_json::Value,
    ) -> Result<(), IdempotencyRepositoryError> {
        self.with_state(IdempotencyRepositoryError::connection, |state| {
            let Some(record) = state.idempotency.get_mut(&scope_of(query)) else {
                return Err(IdempotencyRepositoryError::query(
                    "idempotency claim vanished before completion",
                ));
            };
            record.response_snapshot = response_snapshot.clone();
            Ok(())
        })
    }

    async fn release(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<(), IdempotencyRepositoryError> {
        self.with_state(IdempotencyRepositoryError::connection, |state| {
            state.idempotency.remove(&scope_of(query));
            Ok(())
        })
    }

    async fn cleanup_expired(&self, ttl: Duration) -> Result<u64, IdempotencyRepositoryError> {
        let max_age = chrono::Duration::from_std(ttl)
            .map_err(|err| IdempotencyRepositoryError::query(format!("invalid TTL duration: {err}")))?;
        let cutoff = self.now() - max_age;
        self.with_state(IdempotencyRepositoryError::connection, |state| {
            let before = state.idempotency.len();
            state.idempotency.retain(|_, record| record.created_at >= cutoff);
            Ok(u64::try_from(before - state.idempotency.len()).unwrap_or(u64::MAX))
        })
    }
}
