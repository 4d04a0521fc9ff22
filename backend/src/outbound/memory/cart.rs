//! Cart lines held in memory.

use async_trait::async_trait;

use crate::domain::ports::{CartRepository, CartRepositoryError};
use crate::domain::{CartItem, CartItemId, CartLine, NewCartItem, UserId};

use super::{MemoryState, MemoryStore};

fn check_product(state: &MemoryState, item: &NewCartItem) -> Result<(), CartRepositoryError> {
    if state.products.iter().any(|product| product.id == item.product_id) {
        Ok(())
    } else {
        Err(CartRepositoryError::unknown_product(item.product_id.to_string()))
    }
}

fn to_count(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

impl MemoryStore {
    fn materialise(&self, item: &NewCartItem) -> CartItem {
        CartItem {
            id: CartItemId::random(),
            user_id: item.user_id.clone(),
            product_id: item.product_id.clone(),
            qty: item.qty,
            kind: item.kind,
            window: item.window,
            hold_id: item.hold_id.clone(),
            created_at: self.now(),
        }
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CartLine>, CartRepositoryError> {
        self.with_state(CartRepositoryError::connection, |state| {
            Ok(state
                .cart_items
                .iter()
                .filter(|item| &item.user_id == user_id)
                .filter_map(|item| {
                    state
                        .products
                        .iter()
                        .find(|product| product.id == item.product_id)
                        .map(|product| CartLine {
                            item: item.clone(),
                            product: product.summary(),
                        })
                })
                .collect())
        })
    }

    async fn insert(&self, item: &NewCartItem) -> Result<CartItem, CartRepositoryError> {
        let stored = self.materialise(item);
        self.with_state(CartRepositoryError::connection, |state| {
            check_product(state, item)?;
            if state
                .cart_items
                .iter()
                .any(|existing| existing.hold_id == item.hold_id)
            {
                return Err(CartRepositoryError::query("hold token already in use"));
            }
            state.cart_items.push(stored.clone());
            Ok(stored)
        })
    }

    async fn insert_many(&self, items: &[NewCartItem]) -> Result<u64, CartRepositoryError> {
        let stored: Vec<CartItem> = items.iter().map(|item| self.materialise(item)).collect();
        self.with_state(CartRepositoryError::connection, |state| {
            for item in items {
                check_product(state, item)?;
            }
            let mut inserted = 0_usize;
            for item in stored {
                if state
                    .cart_items
                    .iter()
                    .any(|existing| existing.hold_id == item.hold_id)
                {
                    continue;
                }
                state.cart_items.push(item);
                inserted += 1;
            }
            Ok(to_count(inserted))
        })
    }

    async fn update_qty(
        &self,
        user_id: &UserId,
        item_id: &CartItemId,
        qty: u32,
    ) -> Result<Option<CartItem>, CartRepositoryError> {
        self.with_state(CartRepositoryError::connection, |state| {
            Ok(state
                .cart_items
                .iter_mut()
                .find(|item| &item.id == item_id && &item.user_id == user_id)
                .map(|item| {
                    item.qty = qty;
                    item.clone()
                }))
        })
    }

    async fn delete(
        &self,
        user_id: &UserId,
        item_id: &CartItemId,
    ) -> Result<bool, CartRepositoryError> {
        self.with_state(CartRepositoryError::connection, |state| {
            let before = state.cart_items.len();
            state
                .cart_items
                .retain(|item| !(&item.id == item_id && &item.user_id == user_id));
            Ok(state.cart_items.len() != before)
        })
    }

    async fn delete_many(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, CartRepositoryError> {
        self.with_state(CartRepositoryError::connection, |state| {
            let before = state.cart_items.len();
            state
                .cart_items
                .retain(|item| !(&item.user_id == user_id && item_ids.contains(&item.id)));
            Ok(to_count(before - state.cart_items.len()))
        })
    }

    async fn clear(&self, user_id: &UserId) -> Result<u64, CartRepositoryError> {
        self.with_state(CartRepositoryError::connection, |state| {
            let before = state.cart_items.len();
            state.cart_items.retain(|item| &item.user_id != user_id);
            Ok(to_count(before - state.cart_items.len()))
        })
    }
}
