//! Replay-safe execution of shopper mutations guarded by idempotency keys.
//!
//! A mutation with a key claims it before running. Concurrent requests with
//! the same key wait briefly for the first one to finish and then replay its
//! stored response; a different payload under the same key is a conflict.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::ports::{IdempotencyRepository, IdempotencyRepositoryError};
use super::{
    Error, IdempotencyKey, IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord,
    MutationType, PayloadHash, UserId, canonicalize_and_hash,
};

const IN_PROGRESS_TIMEOUT_MESSAGE: &str = "idempotent request is still in progress; retry shortly";
const RACE_NOT_FOUND_MESSAGE: &str = "idempotency record disappeared during race resolution";
const STATE_KEY: &str = "__idempotency_state";
const STATE_IN_PROGRESS: &str = "in_progress";
const DUPLICATE_RACE_MAX_RETRIES: usize = 20;
const DUPLICATE_RACE_RETRY_DELAY: Duration = Duration::from_millis(25);

/// Key, caller and payload fingerprint of one guarded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotentMutationContext {
    /// Operation the key is scoped to.
    pub mutation_type: MutationType,
    /// Client key; `None` runs the mutation unguarded.
    pub idempotency_key: Option<IdempotencyKey>,
    /// Caller.
    pub user_id: UserId,
    /// Hash of the canonical request payload.
    pub payload_hash: PayloadHash,
}

impl IdempotentMutationContext {
    /// Fingerprint a request payload for `mutation_type`.
    ///
    /// # Errors
    /// Returns an internal [`Error`] when the payload cannot be serialised.
    pub fn new(
        mutation_type: MutationType,
        idempotency_key: Option<IdempotencyKey>,
        user_id: UserId,
        payload: &Value,
    ) -> Result<Self, Error> {
        let payload_hash = canonicalize_and_hash(payload)
            .map_err(|err| Error::internal(format!("failed to hash request payload: {err}")))?;
        Ok(Self {
            mutation_type,
            idempotency_key,
            user_id,
            payload_hash,
        })
    }
}

enum RaceOutcome<T> {
    Response(T),
    Retry,
}

fn map_idempotency_error(error: IdempotencyRepositoryError) -> Error {
    match error {
        IdempotencyRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("idempotency store unavailable: {message}"))
        }
        IdempotencyRepositoryError::Query { message }
        | IdempotencyRepositoryError::Serialization { message }
        | IdempotencyRepositoryError::DuplicateKey { message } => {
            Error::internal(format!("idempotency store error: {message}"))
        }
    }
}

fn in_progress_snapshot() -> Value {
    json!({ STATE_KEY: STATE_IN_PROGRESS })
}

fn is_in_progress(snapshot: &Value) -> bool {
    snapshot.get(STATE_KEY).and_then(Value::as_str) == Some(STATE_IN_PROGRESS)
}

async fn wait_or_fail(attempt: usize, timeout_error: Error) -> Result<(), Error> {
    if attempt == DUPLICATE_RACE_MAX_RETRIES {
        return Err(timeout_error);
    }
    tokio::time::sleep(DUPLICATE_RACE_RETRY_DELAY).await;
    Ok(())
}

/// Runs mutations under the claim/replay protocol.
#[derive(Clone)]
pub struct IdempotentMutationRunner {
    repository: Arc<dyn IdempotencyRepository>,
    clock: Arc<dyn Clock>,
}

impl IdempotentMutationRunner {
    /// Create a runner over an idempotency store.
    pub fn new(repository: Arc<dyn IdempotencyRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Run `operation` once per key, replaying its response to retries.
    ///
    /// # Errors
    /// Propagates the operation's error, returns `conflict` when the key was
    /// used with another payload and `service_unavailable` when a concurrent
    /// request with the same key does not finish in time.
    pub async fn run<T, F, Fut>(
        &self,
        context: IdempotentMutationContext,
        operation: F,
    ) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let IdempotentMutationContext {
            mutation_type,
            idempotency_key,
            user_id,
            payload_hash,
        } = context;

        let Some(key) = idempotency_key else {
            return operation().await;
        };

        let query =
            IdempotencyLookupQuery::new(key.clone(), user_id.clone(), mutation_type, payload_hash.clone());
        let claim = IdempotencyRecord {
            key,
            mutation_type,
            payload_hash,
            response_snapshot: in_progress_snapshot(),
            user_id,
            created_at: self.clock.utc(),
        };

        match self.repository.store_in_progress(&claim).await {
            Ok(()) => {}
            Err(IdempotencyRepositoryError::DuplicateKey { .. }) => {
                debug!(%mutation_type, key = %claim.key, "idempotency key already claimed");
                return self.resolve_duplicate(&query).await;
            }
            Err(err) => return Err(map_idempotency_error(err)),
        }

        let response = match operation().await {
            Ok(response) => response,
            Err(err) => {
                if let Err(release_err) = self.repository.release(&query).await {
                    warn!(error = %release_err, %mutation_type, "failed to release idempotency claim");
                }
                return Err(err);
            }
        };

        let snapshot = serde_json::to_value(&response)
            .map_err(|err| Error::internal(format!("failed to serialise response: {err}")))?;
        self.repository
            .update_response_snapshot(&query, &snapshot)
            .await
            .map_err(map_idempotency_error)?;
        Ok(response)
    }

    async fn resolve_duplicate<T>(&self, query: &IdempotencyLookupQuery) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        for attempt in 0..=DUPLICATE_RACE_MAX_RETRIES {
            let lookup = self
                .repository
                .lookup(query)
                .await
                .map_err(map_idempotency_error)?;
            match lookup {
                IdempotencyLookupResult::MatchingPayload(record) => {
                    match Self::replay(attempt, record).await? {
                        RaceOutcome::Response(response) => return Ok(response),
                        RaceOutcome::Retry => continue,
                    }
                }
                IdempotencyLookupResult::ConflictingPayload(_) => {
                    return Err(Error::conflict(
                        "idempotency key already used with different payload",
                    ));
                }
                IdempotencyLookupResult::NotFound => {
                    wait_or_fail(attempt, Error::internal(RACE_NOT_FOUND_MESSAGE)).await?;
                }
            }
        }
        Err(Error::internal("idempotency race resolution exhausted retries"))
    }

    async fn replay<T>(attempt: usize, record: IdempotencyRecord) -> Result<RaceOutcome<T>, Error>
    where
        T: DeserializeOwned,
    {
        if is_in_progress(&record.response_snapshot) {
            wait_or_fail(
                attempt,
                Error::service_unavailable(IN_PROGRESS_TIMEOUT_MESSAGE),
            )
            .await?;
            return Ok(RaceOutcome::Retry);
        }
        serde_json::from_value(record.response_snapshot)
            .map(RaceOutcome::Response)
            .map_err(|err| Error::internal(format!("failed to replay stored response: {err}")))
    }
}

#[cfg(test)]
#[path = "idempotent_mutation_tests.rs"]
mod tests;
