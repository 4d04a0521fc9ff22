//! Order history, reorder and receipt resend.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::idempotent_mutation::{IdempotentMutationContext, IdempotentMutationRunner};
use super::port_error_mapping::{map_cart_error, map_order_error};
use super::ports::{
    CartRepository, OrderCommand, OrderQuery, OrderRepository, ReceiptNotifier, ReorderOutcome,
    ReorderRequest,
};
use super::{
    AuthContext, Error, HoldId, LineKind, MutationType, NewCartItem, Order, OrderId,
    RentalWindow,
};

/// Order service implementing [`OrderQuery`] and [`OrderCommand`].
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartRepository>,
    notifier: Arc<dyn ReceiptNotifier>,
    idempotency: IdempotentMutationRunner,
}

impl OrderService {
    /// Create the service.
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartRepository>,
        notifier: Arc<dyn ReceiptNotifier>,
        idempotency: IdempotentMutationRunner,
    ) -> Self {
        Self {
            orders,
            carts,
            notifier,
            idempotency,
        }
    }

    async fn owned_order(&self, auth: &AuthContext, order_id: &OrderId) -> Result<Order, Error> {
        self.orders
            .find_for_user(auth.user_id(), order_id)
            .await
            .map_err(map_order_error)?
            .ok_or_else(|| Error::not_found(format!("order {order_id} not found")))
    }

    async fn copy_buy_lines(
        &self,
        auth: &AuthContext,
        order_id: &OrderId,
    ) -> Result<ReorderOutcome, Error> {
        let order = self.owned_order(auth, order_id).await?;
        // Only purchases are copied.
        let lines = order
            .items
            .iter()
            .filter(|item| item.kind == LineKind::Buy)
            .filter_map(|item| {
                NewCartItem::new(
                    auth.user_id().clone(),
                    item.product_id.clone(),
                    item.qty,
                    LineKind::Buy,
                    RentalWindow::default(),
                    HoldId::for_reorder(),
                )
                .ok()
            })
            .collect::<Vec<_>>();
        if lines.is_empty() {
            return Ok(ReorderOutcome { added: 0 });
        }
        let added = self
            .carts
            .insert_many(&lines)
            .await
            .map_err(map_cart_error)?;
        info!(%order_id, added, "order copied back into cart");
        Ok(ReorderOutcome { added })
    }
}

#[async_trait]
impl OrderQuery for OrderService {
    async fn list_orders(&self, auth: &AuthContext) -> Result<Vec<Order>, Error> {
        self.orders
            .list_for_user(auth.user_id())
            .await
            .map_err(map_order_error)
    }

    async fn get_order(&self, auth: &AuthContext, order_id: &OrderId) -> Result<Order, Error> {
        self.owned_order(auth, order_id).await
    }
}

#[async_trait]
impl OrderCommand for OrderService {
    async fn reorder(&self, request: ReorderRequest) -> Result<ReorderOutcome, Error> {
        let ReorderRequest {
            auth,
            order_id,
            idempotency_key,
        } = request;
        let context = IdempotentMutationContext::new(
            MutationType::Reorders,
            idempotency_key,
            auth.user_id().clone(),
            &json!({ "orderId": order_id }),
        )?;
        self.idempotency
            .run(context, || self.copy_buy_lines(&auth, &order_id))
            .await
    }

    async fn resend_receipt(&self, auth: &AuthContext, order_id: &OrderId) -> Result<(), Error> {
        let order = self.owned_order(auth, order_id).await?;
        self.notifier.notify(&order.id);
        info!(order_id = %order.id, "receipt resend queued");
        Ok(())
    }
}

#[cfg(test)]
#[path = "order_service_tests.rs"]
mod tests;
