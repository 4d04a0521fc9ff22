//! Idempotency primitives for safe retries of shopper mutations.
//!
//! Clients may send an `Idempotency-Key` header with cart additions, checkout
//! session creation and reorders. The first response for a key is stored and
//! replayed for retries with the same payload; a different payload under the
//! same key is a conflict.
//!
//! Payloads are canonicalised before hashing (object keys sorted recursively,
//! compact JSON) so semantically equal bodies hash identically.

mod config;
mod key;
mod mutation_type;
mod payload;
mod record;

pub use config::IdempotencyConfig;
pub use key::{IdempotencyKey, IdempotencyKeyValidationError};
pub use mutation_type::{MutationType, ParseMutationTypeError};
pub use payload::{PayloadHash, PayloadHashError, canonicalize_and_hash};
pub use record::{IdempotencyLookupQuery, IdempotencyLookupResult, IdempotencyRecord};
