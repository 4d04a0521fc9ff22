//! Claim, replay and conflict behaviour of the idempotent mutation runner.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Local, TimeZone, Utc};
use mockall::predicate::always;
use rstest::{fixture, rstest};
use serde::Deserialize;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::MockIdempotencyRepository;

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Added {
    added: u32,
}

fn runner(repo: MockIdempotencyRepository) -> IdempotentMutationRunner {
    let now = Utc
        .with_ymd_and_hms(2026, 5, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp");
    IdempotentMutationRunner::new(Arc::new(repo), Arc::new(FixedClock(now)))
}

#[fixture]
fn context() -> IdempotentMutationContext {
    IdempotentMutationContext::new(
        MutationType::Reorders,
        Some(IdempotencyKey::random()),
        UserId::random(),
        &json!({"orderId": "00000000-0000-0000-0000-000000000001"}),
    )
    .expect("hashable payload")
}

fn stored(context: &IdempotentMutationContext, snapshot: Value) -> IdempotencyRecord {
    IdempotencyRecord {
        key: context.idempotency_key.clone().expect("key present"),
        mutation_type: context.mutation_type,
        payload_hash: context.payload_hash.clone(),
        response_snapshot: snapshot,
        user_id: context.user_id.clone(),
        created_at: Utc::now(),
    }
}

#[rstest]
#[tokio::test]
async fn runs_unguarded_without_a_key(mut context: IdempotentMutationContext) {
    context.idempotency_key = None;
    let mut repo = MockIdempotencyRepository::new();
    repo.expect_store_in_progress().times(0);

    let result = runner(repo)
        .run(context, || async { Ok(Added { added: 2 }) })
        .await
        .expect("operation succeeds");

    assert_eq!(result, Added { added: 2 });
}

#[rstest]
#[tokio::test]
async fn stores_the_response_after_claiming(context: IdempotentMutationContext) {
    let expected_type = context.mutation_type;
    let mut repo = MockIdempotencyRepository::new();
    repo.expect_store_in_progress()
        .withf(move |record: &IdempotencyRecord| {
            record.mutation_type == expected_type && is_in_progress(&record.response_snapshot)
        })
        .times(1)
        .return_once(|_| Ok(()));
    repo.expect_update_response_snapshot()
        .withf(|_, snapshot: &Value| snapshot == &json!({"added": 1}))
        .times(1)
        .return_once(|_, _| Ok(()));

    let result = runner(repo)
        .run(context, || async { Ok(Added { added: 1 }) })
        .await
        .expect("operation succeeds");

    assert_eq!(result.added, 1);
}

#[rstest]
#[tokio::test]
async fn releases_the_claim_when_the_operation_fails(context: IdempotentMutationContext) {
    let mut repo = MockIdempotencyRepository::new();
    repo.expect_store_in_progress()
        .times(1)
        .return_once(|_| Ok(()));
    repo.expect_release()
        .with(always())
        .times(1)
        .return_once(|_| Ok(()));
    repo.expect_update_response_snapshot().times(0);

    let error = runner(repo)
        .run::<Added, _, _>(context, || async { Err(Error::not_found("order not found")) })
        .await
        .expect_err("operation error propagates");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn replays_the_stored_response_for_a_duplicate(context: IdempotentMutationContext) {
    let record = stored(&context, json!({"added": 3}));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut repo = MockIdempotencyRepository::new();
    repo.expect_store_in_progress()
        .times(1)
        .return_once(|_| Err(IdempotencyRepositoryError::duplicate_key("race")));
    repo.expect_lookup()
        .times(1)
        .return_once(move |_| Ok(IdempotencyLookupResult::MatchingPayload(record)));

    let counter = Arc::clone(&calls);
    let result = runner(repo)
        .run(context, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Added { added: 99 })
        })
        .await
        .expect("replayed response");

    assert_eq!(result, Added { added: 3 });
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn rejects_a_reused_key_with_another_payload(context: IdempotentMutationContext) {
    let record = stored(&context, json!({"added": 3}));
    let mut repo = MockIdempotencyRepository::new();
    repo.expect_store_in_progress()
        .times(1)
        .return_once(|_| Err(IdempotencyRepositoryError::duplicate_key("race")));
    repo.expect_lookup()
        .times(1)
        .return_once(move |_| Ok(IdempotencyLookupResult::ConflictingPayload(record)));

    let error = runner(repo)
        .run(context, || async { Ok(Added { added: 1 }) })
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn waits_for_an_in_flight_duplicate_then_replays(context: IdempotentMutationContext) {
    let pending = stored(&context, in_progress_snapshot());
    let done = stored(&context, json!({"added": 4}));
    let mut sequence = mockall::Sequence::new();
    let mut repo = MockIdempotencyRepository::new();
    repo.expect_store_in_progress()
        .times(1)
        .return_once(|_| Err(IdempotencyRepositoryError::duplicate_key("race")));
    repo.expect_lookup()
        .times(1)
        .in_sequence(&mut sequence)
        .return_once(move |_| Ok(IdempotencyLookupResult::MatchingPayload(pending)));
    repo.expect_lookup()
        .times(1)
        .in_sequence(&mut sequence)
        .return_once(move |_| Ok(IdempotencyLookupResult::MatchingPayload(done)));

    let result = runner(repo)
        .run(context, || async { Ok(Added { added: 0 }) })
        .await
        .expect("replayed after wait");

    assert_eq!(result.added, 4);
}

#[rstest]
#[tokio::test]
async fn maps_store_outages_to_service_unavailable(context: IdempotentMutationContext) {
    let mut repo = MockIdempotencyRepository::new();
    repo.expect_store_in_progress()
        .times(1)
        .return_once(|_| Err(IdempotencyRepositoryError::connection("refused")));

    let error = runner(repo)
        .run(context, || async { Ok(Added { added: 1 }) })
        .await
        .expect_err("store outage");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}
