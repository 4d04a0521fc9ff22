//! Two settlement workers racing over one store settle each group-buy once.

use std::sync::Arc;

use chrono::TimeDelta;
use fluxcart::domain::ports::CreateGroupBuyRequest;
use fluxcart::domain::{
    GroupBuySettlementConfig, GroupBuySettlementPorts, GroupBuySettlementWorker, GroupBuyStatus,
};
use fluxcart::test_support::catalog::product;
use fluxcart::test_support::clock::fixture_now;
use fluxcart::test_support::shop::TestShop;

#[path = "support/shop.rs"]
#[expect(dead_code, reason = "settlement races never fill carts directly")]
mod shop_support;

use shop_support::sign_in;

fn worker(shop: &TestShop) -> GroupBuySettlementWorker {
    GroupBuySettlementWorker::new(
        GroupBuySettlementPorts::new(shop.store.clone(), shop.store.clone()),
        shop.clock.clone(),
        GroupBuySettlementConfig::default(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_workers_place_one_hold_per_participant() {
    let lamp = product("brass-lamp", 60_000);
    let shop = Arc::new(TestShop::new(vec![lamp.clone()]));
    let host = sign_in(&shop, "host@example.com").await;
    let group_buy = shop
        .state
        .group_buys
        .create(CreateGroupBuyRequest {
            auth: host,
            product_id: lamp.id.clone(),
            min_participants: 2,
            deadline: fixture_now() + TimeDelta::minutes(10),
            idempotency_key: None,
        })
        .await
        .expect("group-buy created");

    let mut participants = Vec::new();
    for identifier in ["ada@example.com", "grace@example.com", "linus@example.com"] {
        let auth = sign_in(&shop, identifier).await;
        shop.state
            .group_buys
            .join(&auth, &group_buy.id)
            .await
            .expect("join succeeds");
        participants.push(auth);
    }
    shop.clock.advance_seconds(601);

    let first = worker(&shop);
    let second = worker(&shop);
    let (left, right) = tokio::join!(first.settle_once(), second.settle_once());
    let left = left.expect("first pass");
    let right = right.expect("second pass");

    assert_eq!(left.succeeded + right.succeeded, 1);
    assert_eq!(left.failed + right.failed, 0);
    assert_eq!(left.errored + right.errored, 0);

    for auth in &participants {
        let lines = shop
            .state
            .cart_query
            .list_items(auth)
            .await
            .expect("cart listed");
        assert_eq!(lines.len(), 1, "one hold per participant");
        let line = lines.first().expect("hold line");
        assert_eq!(line.item.product_id, lamp.id);
        assert_eq!(line.item.qty, 1);
    }

    let detail = shop
        .state
        .group_buys_query
        .get(&group_buy.id)
        .await
        .expect("group-buy found");
    assert_eq!(detail.group_buy.status, GroupBuyStatus::Success);

    let rerun = worker(&shop).settle_once().await.expect("rerun");
    assert_eq!(rerun.settled(), 0);
}
