//! Port abstraction for idempotency key persistence.
//!
//! Keys are scoped per user and [`MutationType`], so one UUID can guard a
//! cart addition and a checkout without colliding. A request first claims its
//! key with an in-progress marker, then overwrites the marker with the
//! response once the mutation succeeds. Claims of failed mutations are
//! released so the client may retry with the same key.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by idempotency repository adapters.
    pub enum IdempotencyRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "idempotency repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "idempotency repository query failed: {message}",
        /// Response serialization or deserialization failed.
        Serialization { message: String } => "idempotency repository serialization failed: {message}",
        /// A record with this key already exists (concurrent insert race).
        DuplicateKey { message: String } => "idempotency key already exists: {message}",
    }
}

/// Port for idempotency record storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    /// Look up a key for the query's user and mutation type.
    ///
    /// Returns [`IdempotencyLookupResult::MatchingPayload`] when the stored
    /// payload hash equals the query's, and
    /// [`IdempotencyLookupResult::ConflictingPayload`] otherwise.
    async fn lookup(
        &self,
        query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError>;

    /// Insert a claim for a key.
    ///
    /// Fails with [`IdempotencyRepositoryError::DuplicateKey`] when a record
    /// for the same key, user and mutation type already exists.
    async fn store_in_progress(
        &self,
        record: &IdempotencyRecord,
    ) -> Result<(), IdempotencyRepositoryError>;

    /// Replace the stored response snapshot of a claimed key.
    async fn update_response_snapshot(
        &self,
        query: &IdempotencyLookupQuery,
        response_snapshot: &serde_json::Value,
    ) -> Result<(), IdempotencyRepositoryError>;

    /// Drop a claim whose mutation failed.
    async fn release(&self, query: &IdempotencyLookupQuery)
    -> Result<(), IdempotencyRepositoryError>;

    /// Remove records older than `ttl`, returning how many were deleted.
    async fn cleanup_expired(&self, ttl: Duration) -> Result<u64, IdempotencyRepositoryError>;
}

/// Repository that never remembers anything.
///
/// Every lookup misses and every claim succeeds, so mutations always run.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdempotencyRepository;

#[async_trait]
impl IdempotencyRepository for FixtureIdempotencyRepository {
    async fn lookup(
        &self,
        _query: &IdempotencyLookupQuery,
    ) -> Result<IdempotencyLookupResult, IdempotencyRepositoryError> {
        Ok(IdempotencyLookupResult::NotFound)
    }

    async fn store_in_progress(
        &self,
        _record: &IdempotencyRecord,
    ) -> Result<(), IdempotencyRepositoryError> {
        Ok(())
    }

    async fn update_response_snapshot(
        &self,
        _query: &IdempotencyLookupQuery,
        _response_snapshot: &serde_json::Value,
    ) -> Result<(), IdempotencyRepositoryError> {
        Ok(())
    }

    async fn release(
        &self,
        _query: &IdempotencyLookupQuery,
    ) -> Result<(), IdempotencyRepositoryError> {
        Ok(())
    }

    async fn cleanup_expired(&self, _ttl: Duration) -> Result<u64, IdempotencyRepositoryError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{IdempotencyKey, MutationType, UserId, canonicalize_and_hash};
    use serde_json::json;

    #[tokio::test]
    async fn fixture_repository_never_finds_keys() {
        let repo = FixtureIdempotencyRepository;
        let hash = canonicalize_and_hash(&json!({"qty": 1})).expect("hashable payload");

        for mutation_type in MutationType::ALL {
            let query = IdempotencyLookupQuery::new(
                IdempotencyKey::random(),
                UserId::random(),
                mutation_type,
                hash.clone(),
            );
            let result = repo.lookup(&query).await.expect("fixture lookup");
            assert_eq!(result, IdempotencyLookupResult::NotFound);
        }
    }

    #[tokio::test]
    async fn fixture_repository_cleanup_reports_nothing_removed() {
        let removed = FixtureIdempotencyRepository
            .cleanup_expired(Duration::from_secs(3600))
            .await
            .expect("fixture cleanup");
        assert_eq!(removed, 0);
    }

    #[test]
    fn duplicate_key_constructor_accepts_str() {
        let err = IdempotencyRepositoryError::duplicate_key("k1");
        assert_eq!(err.to_string(), "idempotency key already exists: k1");
    }
}
