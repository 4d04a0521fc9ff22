//! Tests for group-buy creation and joins.

use chrono::{Duration, Utc};
use rstest::rstest;

use super::*;
use crate::domain::ports::{MockGroupBuyRepository, MockProductRepository};
use crate::domain::{ErrorCode, GroupBuyStatus, UserId};
use crate::test_support::catalog::product;
use crate::test_support::clock::{MutableClock, fixture_now};
use crate::test_support::idempotency::forgetful_runner;

fn service(group_buys: MockGroupBuyRepository, products: MockProductRepository) -> GroupBuyService {
    GroupBuyService::new(
        Arc::new(group_buys),
        Arc::new(products),
        forgetful_runner(),
        Arc::new(MutableClock::default()),
    )
}

fn request(product_id: ProductId, min_participants: i64, hours_left: i64) -> CreateGroupBuyRequest {
    CreateGroupBuyRequest {
        auth: AuthContext::new(UserId::random()),
        product_id,
        min_participants,
        deadline: fixture_now() + Duration::hours(hours_left),
        idempotency_key: None,
    }
}

fn stored(draft: &GroupBuyDraft, now: chrono::DateTime<Utc>) -> GroupBuy {
    GroupBuy {
        id: GroupBuyId::random(),
        product_id: draft.product_id.clone(),
        creator_id: draft.creator_id.clone(),
        min_participants: draft.min_participants,
        deadline: draft.deadline,
        status: GroupBuyStatus::Open,
        participant_count: 0,
        created_at: now,
        settled_at: None,
    }
}

#[rstest]
#[tokio::test]
async fn opens_a_group_buy_for_an_existing_product() {
    let lamp = product("lamp", 1_000);
    let found = lamp.clone();
    let mut products = MockProductRepository::new();
    products
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(found)));
    let mut group_buys = MockGroupBuyRepository::new();
    group_buys
        .expect_create()
        .withf(|_, now| *now == fixture_now())
        .times(1)
        .returning(|draft, now| Ok(stored(draft, now)));

    let created = service(group_buys, products)
        .create(request(lamp.id.clone(), 3, 24))
        .await
        .expect("created");

    assert_eq!(created.status, GroupBuyStatus::Open);
    assert_eq!(created.min_participants, 3);
}

#[rstest]
#[case(0, 24, "minParticipants")]
#[case(3, 0, "deadline")]
#[case(3, -1, "deadline")]
#[tokio::test]
async fn invalid_drafts_are_rejected(
    #[case] min_participants: i64,
    #[case] hours_left: i64,
    #[case] field: &str,
) {
    let mut group_buys = MockGroupBuyRepository::new();
    group_buys.expect_create().times(0);

    let error = service(group_buys, MockProductRepository::new())
        .create(request(ProductId::random(), min_participants, hours_left))
        .await
        .expect_err("invalid draft");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    let reported = error
        .details()
        .and_then(|details| details.get("field"))
        .and_then(|value| value.as_str());
    assert_eq!(reported, Some(field));
}

#[rstest]
#[tokio::test]
async fn unknown_products_cannot_be_grouped() {
    let mut products = MockProductRepository::new();
    products.expect_find_by_id().return_once(|_| Ok(None));
    let mut group_buys = MockGroupBuyRepository::new();
    group_buys.expect_create().times(0);

    let error = service(group_buys, products)
        .create(request(ProductId::random(), 2, 1))
        .await
        .expect_err("missing product");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(JoinOutcome::Joined, false)]
#[case(JoinOutcome::AlreadyJoined, true)]
#[tokio::test]
async fn joins_are_idempotent(#[case] outcome: JoinOutcome, #[case] already_joined: bool) {
    let mut group_buys = MockGroupBuyRepository::new();
    group_buys
        .expect_join()
        .times(1)
        .return_once(move |_, _, _| Ok(outcome));

    let receipt = service(group_buys, MockProductRepository::new())
        .join(&AuthContext::new(UserId::random()), &GroupBuyId::random())
        .await
        .expect("joined");

    assert_eq!(
        receipt,
        JoinReceipt {
            ok: true,
            already_joined
        }
    );
}

#[rstest]
#[tokio::test]
async fn closed_group_buys_refuse_joins() {
    let mut group_buys = MockGroupBuyRepository::new();
    group_buys
        .expect_join()
        .return_once(|_, _, _| Ok(JoinOutcome::Closed));

    let error = service(group_buys, MockProductRepository::new())
        .join(&AuthContext::new(UserId::random()), &GroupBuyId::random())
        .await
        .expect_err("closed");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details().and_then(|details| details.get("code")),
        Some(&json!("group_buy_closed"))
    );
}

#[rstest]
#[tokio::test]
async fn missing_group_buys_are_not_found() {
    let mut group_buys = MockGroupBuyRepository::new();
    group_buys
        .expect_join()
        .return_once(|_, _, _| Ok(JoinOutcome::NotFound));
    group_buys.expect_find().return_once(|_| Ok(None));
    let service = service(group_buys, MockProductRepository::new());
    let id = GroupBuyId::random();

    let join = service
        .join(&AuthContext::new(UserId::random()), &id)
        .await
        .expect_err("missing");
    let read = service.get(&id).await.expect_err("missing");

    assert_eq!(join.code(), ErrorCode::NotFound);
    assert_eq!(read.code(), ErrorCode::NotFound);
}
