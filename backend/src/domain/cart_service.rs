//! Cart service implementing the cart driving ports.
//!
//! Every add creates a distinct line with its own hold token, even for a
//! product already in the cart.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::idempotent_mutation::{IdempotentMutationContext, IdempotentMutationRunner};
use super::port_error_mapping::{map_cart_error, map_product_error};
use super::ports::{
    AddCartItemRequest, CartCommand, CartQuery, CartRepository, ProductRepository,
    QuantityUpdate,
};
use super::{
    AuthContext, CartItem, CartItemId, CartLine, CartValidationError, Error, HoldId, LineKind,
    MutationType, NewCartItem,
};

/// Cart service over the cart and product stores.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    idempotency: IdempotentMutationRunner,
}

fn validation_error(field: &str, error: &CartValidationError) -> Error {
    let code = match error {
        CartValidationError::ZeroQuantity => "qty_too_small",
        CartValidationError::InvertedWindow => "inverted_rental_window",
    };
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": field,
        "code": code,
    }))
}

impl CartService {
    /// Create the service.
    pub fn new(
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductRepository>,
        idempotency: IdempotentMutationRunner,
    ) -> Self {
        Self {
            carts,
            products,
            idempotency,
        }
    }

    fn payload(request: &AddCartItemRequest) -> serde_json::Value {
        json!({
            "productId": request.product_id,
            "qty": request.qty,
            "kind": request.kind,
            "startDate": request.window.start_date,
            "endDate": request.window.end_date,
        })
    }

    async fn insert_line(&self, request: AddCartItemRequest) -> Result<CartItem, Error> {
        let product = self
            .products
            .find_by_id(&request.product_id)
            .await
            .map_err(map_product_error)?
            .ok_or_else(|| Error::not_found("product not found"))?;
        if request.kind == LineKind::Rent && !product.is_rentable() {
            return Err(
                Error::invalid_request("product cannot be rented").with_details(json!({
                    "field": "kind",
                    "code": "not_rentable",
                    "value": LineKind::Rent,
                })),
            );
        }
        let item = NewCartItem::new(
            request.auth.user_id().clone(),
            request.product_id,
            request.qty,
            request.kind,
            request.window,
            HoldId::for_cart(),
        )
        .map_err(|err| validation_error("qty", &err))?;
        let stored = self.carts.insert(&item).await.map_err(map_cart_error)?;
        debug!(item_id = %stored.id, hold_id = %stored.hold_id, "cart line added");
        Ok(stored)
    }
}

#[async_trait]
impl CartCommand for CartService {
    async fn add_item(&self, request: AddCartItemRequest) -> Result<CartItem, Error> {
        let context = IdempotentMutationContext::new(
            MutationType::CartItems,
            request.idempotency_key.clone(),
            request.auth.user_id().clone(),
            &Self::payload(&request),
        )?;
        self.idempotency
            .run(context, || self.insert_line(request))
            .await
    }

    async fn set_qty(
        &self,
        auth: &AuthContext,
        item_id: &CartItemId,
        qty: u32,
    ) -> Result<QuantityUpdate, Error> {
        if qty == 0 {
            self.remove_item(auth, item_id).await?;
            return Ok(QuantityUpdate::Deleted);
        }
        self.carts
            .update_qty(auth.user_id(), item_id, qty)
            .await
            .map_err(map_cart_error)?
            .map(QuantityUpdate::Updated)
            .ok_or_else(|| Error::not_found("cart item not found"))
    }

    async fn remove_item(&self, auth: &AuthContext, item_id: &CartItemId) -> Result<(), Error> {
        let removed = self
            .carts
            .delete(auth.user_id(), item_id)
            .await
            .map_err(map_cart_error)?;
        if removed {
            Ok(())
        } else {
            Err(Error::not_found("cart item not found"))
        }
    }

    async fn clear(&self, auth: &AuthContext) -> Result<u64, Error> {
        self.carts
            .clear(auth.user_id())
            .await
            .map_err(map_cart_error)
    }
}

#[async_trait]
impl CartQuery for CartService {
    async fn list_items(&self, auth: &AuthContext) -> Result<Vec<CartLine>, Error> {
        self.carts
            .list_for_user(auth.user_id())
            .await
            .map_err(map_cart_error)
    }
}

#[cfg(test)]
#[path = "cart_service_tests.rs"]
mod tests;
