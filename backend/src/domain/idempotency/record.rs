//! What the idempotency store keeps per key, and how it is queried.

use chrono::{DateTime, Utc};

use super::super::UserId;
use super::{IdempotencyKey, MutationType, PayloadHash};

/// First response produced under a key, kept for replay.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub key: IdempotencyKey,
    pub mutation_type: MutationType,
    pub payload_hash: PayloadHash,
    /// JSON body returned to the first request and replayed verbatim.
    pub response_snapshot: serde_json::Value,
    /// Owner; keys never leak across shoppers.
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// How a retry relates to what is already stored.
#[derive(Debug, Clone, PartialEq)]
pub enum IdempotencyLookupResult {
    NotFound,
    /// Same payload: replay the stored response.
    MatchingPayload(IdempotencyRecord),
    /// Same key, different payload: refuse with a conflict.
    ConflictingPayload(IdempotencyRecord),
}

/// A key lookup scoped to one shopper and one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyLookupQuery {
    pub key: IdempotencyKey,
    pub user_id: UserId,
    pub mutation_type: MutationType,
    pub payload_hash: PayloadHash,
}

impl IdempotencyLookupQuery {
    #[must_use]
    pub const fn new(
        key: IdempotencyKey,
        user_id: UserId,
        mutation_type: MutationType,
        payload_hash: PayloadHash,
    ) -> Self {
        Self {
            key,
            user_id,
            mutation_type,
            payload_hash,
        }
    }
}
