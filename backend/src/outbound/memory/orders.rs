//! Orders held in memory.
//!
//! Item product summaries are attached on read so they reflect the live
//! catalog, as the SQL adapter does.

use std::cmp::Reverse;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{OrderRepository, OrderRepositoryError};
use crate::domain::{
    NewOrder, Order, OrderId, OrderItem, OrderStatus, PaymentReference, UserId,
};

use super::{MemoryState, MemoryStore};

fn hydrate(state: &MemoryState, order: &Order) -> Order {
    let mut hydrated = order.clone();
    for item in &mut hydrated.items {
        item.product = state
            .products
            .iter()
            .find(|product| product.id == item.product_id)
            .map(crate::domain::Product::summary);
    }
    hydrated
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: &NewOrder) -> Result<OrderId, OrderRepositoryError> {
        let totals = order.totals();
        let stored = Order {
            id: OrderId::random(),
            user_id: order.user_id().clone(),
            status: OrderStatus::Paid,
            total_cents: totals.total_cents,
            discount_cents: totals.discount_cents,
            payment_reference: order.payment_reference().clone(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItem {
                    product_id: item.product_id.clone(),
                    qty: item.qty,
                    kind: item.kind,
                    price_cents: item.price_cents,
                    product: None,
                })
                .collect(),
            created_at: self.now(),
        };
        self.with_state(OrderRepositoryError::connection, |state| {
            if state
                .orders
                .iter()
                .any(|existing| &existing.payment_reference == order.payment_reference())
            {
                return Err(OrderRepositoryError::duplicate_reference(
                    order.payment_reference().as_ref(),
                ));
            }
            let id = stored.id.clone();
            debug!(order_id = %id, payment_reference = %stored.payment_reference, "order stored in memory");
            state.orders.push(stored);
            Ok(id)
        })
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<OrderId>, OrderRepositoryError> {
        self.with_state(OrderRepositoryError::connection, |state| {
            Ok(state
                .orders
                .iter()
                .find(|order| &order.payment_reference == reference)
                .map(|order| order.id.clone()))
        })
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        self.with_state(OrderRepositoryError::connection, |state| {
            Ok(state
                .orders
                .iter()
                .find(|order| &order.id == id)
                .map(|order| hydrate(state, order)))
        })
    }

    async fn find_for_user(
        &self,
        user_id: &UserId,
        id: &OrderId,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        self.with_state(OrderRepositoryError::connection, |state| {
            Ok(state
                .orders
                .iter()
                .find(|order| &order.id == id && &order.user_id == user_id)
                .map(|order| hydrate(state, order)))
        })
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, OrderRepositoryError> {
        self.with_state(OrderRepositoryError::connection, |state| {
            // Reverse insertion order breaks ties between equal timestamps.
            let mut orders: Vec<Order> = state
                .orders
                .iter()
                .rev()
                .filter(|order| &order.user_id == user_id)
                .map(|order| hydrate(state, order))
                .collect();
            orders.sort_by_key(|order| Reverse(order.created_at));
            Ok(orders)
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for in-memory order storage.
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::domain::{LineKind, NewOrderItem, Product, Totals};
    use crate::test_support::catalog::product;
    use crate::test_support::clock::MutableClock;

    fn new_order(user: &UserId, lamp: &Product, reference: &str) -> NewOrder {
        NewOrder::new(
            user.clone(),
            PaymentReference::new(reference).expect("reference"),
            vec![NewOrderItem {
                product_id: lamp.id.clone(),
                qty: 2,
                kind: LineKind::Buy,
                price_cents: 1_000,
            }],
            Totals::with_discount(2_000, 0).expect("totals"),
        )
        .expect("valid order")
    }

    #[rstest]
    #[tokio::test]
    async fn second_order_for_a_reference_is_a_duplicate() {
        let lamp = product("lamp", 1_000);
        let store = MemoryStore::with_products(Arc::new(MutableClock::default()), vec![lamp.clone()]);
        let user = UserId::random();

        store
            .create(&new_order(&user, &lamp, "cs_test_1"))
            .await
            .expect("first order");
        let error = store
            .create(&new_order(&user, &lamp, "cs_test_1"))
            .await
            .expect_err("duplicate");

        assert_eq!(error, OrderRepositoryError::duplicate_reference("cs_test_1"));
    }

    #[rstest]
    #[tokio::test]
    async fn lists_newest_first_with_live_summaries() {
        let lamp = product("lamp", 1_000);
        let clock = Arc::new(MutableClock::default());
        let store = MemoryStore::with_products(clock.clone(), vec![lamp.clone()]);
        let user = UserId::random();

        let first = store
            .create(&new_order(&user, &lamp, "sim_a"))
            .await
            .expect("first");
        clock.advance_seconds(60);
        let second = store
            .create(&new_order(&user, &lamp, "sim_b"))
            .await
            .expect("second");

        let orders = store.list_for_user(&user).await.expect("list");
        let ids: Vec<_> = orders.iter().map(|order| order.id.clone()).collect();
        assert_eq!(ids, vec![second, first]);
        let summary = orders
            .first()
            .and_then(|order| order.items.first())
            .and_then(|item| item.product.clone());
        assert_eq!(summary.map(|s| s.slug), Some("lamp".to_owned()));
    }

    #[rstest]
    #[tokio::test]
    async fn orders_are_invisible_to_other_users() {
        let lamp = product("lamp", 1_000);
        let store = MemoryStore::with_products(Arc::new(MutableClock::default()), vec![lamp.clone()]);
        let owner = UserId::random();
        let id = store
            .create(&new_order(&owner, &lamp, "sim_c"))
            .await
            .expect("order");

        let found = store
            .find_for_user(&UserId::random(), &id)
            .await
            .expect("lookup");

        assert!(found.is_none());
    }
}
