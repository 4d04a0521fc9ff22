//! In-process store implementing every repository port.
//!
//! Used when no database URL is configured and by integration tests. All
//! state sits behind one mutex, so each port call observes and mutates a
//! consistent snapshot; the group-buy join and claim therefore serialise
//! exactly as the row lock and conditional update do in PostgreSQL.
//!
//! ```
//! use std::sync::Arc;
//!
//! use fluxcart::domain::ports::CartRepository;
//! use fluxcart::outbound::memory::MemoryStore;
//! use mockable::DefaultClock;
//!
//! let store = MemoryStore::new(Arc::new(DefaultClock));
//! let carts: Arc<dyn CartRepository> = Arc::new(store.clone());
//! # let _ = carts;
//! ```

mod cart;
mod catalog;
mod checkout;
mod group_buys;
mod idempotency;
mod orders;
mod users;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use mockable::Clock;
use uuid::Uuid;

use crate::domain::{
    CartItem, CheckoutSession, GroupBuy, GroupBuyId, GroupBuyParticipant, IdempotencyRecord,
    MutationType, Order, Product, Profile, UserId,
};

/// Scope of one idempotency record.
type IdempotencyScope = (Uuid, UserId, MutationType);

#[derive(Debug, Clone)]
struct StoredGroupBuy {
    group_buy: GroupBuy,
    settlement_started_at: Option<DateTime<Utc>>,
    participants: Vec<GroupBuyParticipant>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<Profile>,
    products: Vec<Product>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    checkout_sessions: HashMap<String, CheckoutSession>,
    group_buys: HashMap<GroupBuyId, StoredGroupBuy>,
    idempotency: HashMap<IdempotencyScope, IdempotencyRecord>,
}

/// Shared in-memory backing store. Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store stamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }

    /// Create a store preloaded with catalog products.
    pub fn with_products(clock: Arc<dyn Clock>, products: Vec<Product>) -> Self {
        let store = Self::new(clock);
        if let Ok(mut state) = store.state.lock() {
            state.products = products;
        }
        store
    }

    /// Add or replace a catalog product.
    ///
    /// Returns `false` when the store lock was poisoned.
    pub fn upsert_product(&self, product: Product) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        state.products.retain(|existing| existing.id != product.id);
        state.products.push(product);
        true
    }

    /// Remove a catalog product, leaving dangling cart and order lines.
    pub fn remove_product(&self, slug: &str) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let before = state.products.len();
        state.products.retain(|product| product.slug != slug);
        state.products.len() != before
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Run `f` against the locked state, mapping a poisoned lock through
    /// `poisoned`.
    fn with_state<T, E>(
        &self,
        poisoned: impl FnOnce(&'static str) -> E,
        f: impl FnOnce(&mut MemoryState) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard: MutexGuard<'_, MemoryState> = self
            .state
            .lock()
            .map_err(|_| poisoned("memory store lock poisoned"))?;
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for store-level helpers.
    use super::*;
    use crate::test_support::catalog::product;
    use crate::test_support::clock::MutableClock;
    use rstest::rstest;

    #[rstest]
    fn upserting_a_product_replaces_the_previous_version() {
        let store = MemoryStore::new(Arc::new(MutableClock::default()));
        let mut lamp = product("lamp", 1_000);
        assert!(store.upsert_product(lamp.clone()));
        lamp.price_cents = 2_000;
        assert!(store.upsert_product(lamp));

        let prices = store
            .with_state(
                |message| message.to_owned(),
                |state| Ok::<_, String>(state.products.iter().map(|p| p.price_cents).collect::<Vec<_>>()),
            )
            .expect("state");
        assert_eq!(prices, vec![2_000]);
    }

    #[rstest]
    fn removing_an_unknown_slug_reports_false() {
        let store = MemoryStore::new(Arc::new(MutableClock::default()));
        assert!(!store.remove_product("ghost"));
    }
}
