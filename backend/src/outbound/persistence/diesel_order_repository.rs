//! PostgreSQL-backed `OrderRepository` implementation using Diesel ORM.
//!
//! An order and its items are written in one transaction. The unique
//! constraint on `orders.payment_reference` turns a second confirmation of
//! the same payment into [`OrderRepositoryError::DuplicateReference`].

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{OrderRepository, OrderRepositoryError};
use crate::domain::{
    LineKind, NewOrder, Order, OrderId, OrderItem, OrderStatus, PaymentReference, ProductId,
    ProductSummary, UserId,
};

use super::diesel_cart_repository::to_summary;
use super::diesel_error_mapping::{DieselFailure, pool_error_message, to_u32};
use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow, ProductRow};
use super::pool::{DbPool, PoolError};
use super::schema::{order_items, orders, products};

/// Diesel-backed order storage.
#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> OrderRepositoryError {
    OrderRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> OrderRepositoryError {
    match DieselFailure::from(error) {
        DieselFailure::Connection => OrderRepositoryError::connection("database connection error"),
        DieselFailure::UniqueViolation { .. } => {
            OrderRepositoryError::query("unique constraint violated")
        }
        DieselFailure::ForeignKeyViolation { .. } => {
            OrderRepositoryError::query("foreign key constraint violated")
        }
        DieselFailure::Query { message } => OrderRepositoryError::query(message),
    }
}

fn map_create_error(error: diesel::result::Error, reference: &PaymentReference) -> OrderRepositoryError {
    match DieselFailure::from(error) {
        DieselFailure::UniqueViolation { .. } => {
            OrderRepositoryError::duplicate_reference(reference.as_ref())
        }
        DieselFailure::Connection => OrderRepositoryError::connection("database connection error"),
        DieselFailure::ForeignKeyViolation { .. } => {
            OrderRepositoryError::query("order references an unknown user")
        }
        DieselFailure::Query { message } => OrderRepositoryError::query(message),
    }
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_order(
    row: OrderRow,
    item_rows: Vec<OrderItemRow>,
    summaries: &HashMap<Uuid, ProductSummary>,
) -> Result<Order, OrderRepositoryError> {
    let status = OrderStatus::from_str(&row.status)
        .map_err(|err| OrderRepositoryError::query(format!("invalid order status in database: {err}")))?;
    let payment_reference = PaymentReference::new(row.payment_reference)
        .map_err(|err| OrderRepositoryError::query(format!("invalid payment reference in database: {err}")))?;
    let items = item_rows
        .into_iter()
        .map(|item| {
            let kind = LineKind::from_str(&item.kind).map_err(|err| {
                OrderRepositoryError::query(format!("invalid line kind in database: {err}"))
            })?;
            Ok(OrderItem {
                product_id: ProductId::from_uuid(item.product_id),
                qty: to_u32(item.qty),
                kind,
                price_cents: item.price_cents,
                product: summaries.get(&item.product_id).cloned(),
            })
        })
        .collect::<Result<Vec<_>, OrderRepositoryError>>()?;
    Ok(Order {
        id: OrderId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        status,
        total_cents: row.total_cents,
        discount_cents: row.discount_cents,
        payment_reference,
        items,
        created_at: row.created_at,
    })
}

/// Load the items of `order_rows` and assemble full orders in input order.
async fn assemble(
    conn: &mut AsyncPgConnection,
    order_rows: Vec<OrderRow>,
) -> Result<Vec<Order>, OrderRepositoryError> {
    if order_rows.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = order_rows.iter().map(|row| row.id).collect();
    let item_rows: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .order((order_items::order_id.asc(), order_items::position.asc()))
        .select(OrderItemRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;

    let product_ids: Vec<Uuid> = item_rows.iter().map(|item| item.product_id).collect();
    let summaries: HashMap<Uuid, ProductSummary> = products::table
        .filter(products::id.eq_any(&product_ids))
        .select(ProductRow::as_select())
        .load::<ProductRow>(conn)
        .await
        .map_err(map_diesel_error)?
        .iter()
        .map(|row| (row.id, to_summary(row)))
        .collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
    for item in item_rows {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    order_rows
        .into_iter()
        .map(|row| {
            let items = items_by_order.remove(&row.id).unwrap_or_default();
            to_order(row, items, &summaries)
        })
        .collect()
}

#[async_trait]
impl OrderRepository for DieselOrderRepository {
    async fn create(&self, order: &NewOrder) -> Result<OrderId, OrderRepositoryError> {
        let order_id = Uuid::new_v4();
        let totals = order.totals();
        let reference = order.payment_reference().clone();
        let order_row = NewOrderRow {
            id: order_id,
            user_id: *order.user_id().as_uuid(),
            status: OrderStatus::Paid.as_str(),
            total_cents: totals.total_cents,
            discount_cents: totals.discount_cents,
            payment_reference: reference.as_ref(),
        };
        let item_rows = order
            .items()
            .iter()
            .enumerate()
            .map(|(position, item)| {
                Ok(NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: *item.product_id.as_uuid(),
                    qty: i32::try_from(item.qty)
                        .map_err(|_| OrderRepositoryError::query("quantity out of range"))?,
                    kind: item.kind.as_str(),
                    price_cents: item.price_cents,
                    position: to_i32(position),
                })
            })
            .collect::<Result<Vec<_>, OrderRepositoryError>>()?;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::insert_into(orders::table)
                    .values(&order_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(order_items::table)
                    .values(&item_rows)
                    .execute(conn)
                    .await?;
                Ok::<(), diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| map_create_error(err, &reference))?;

        debug!(order_id = %order_id, payment_reference = %reference, "order persisted");
        Ok(OrderId::from_uuid(order_id))
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<OrderId>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        orders::table
            .filter(orders::payment_reference.eq(reference.as_ref()))
            .select(orders::id)
            .first::<Uuid>(&mut conn)
            .await
            .optional()
            .map(|id| id.map(OrderId::from_uuid))
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<OrderRow> = orders::table
            .find(id.as_uuid())
            .select(OrderRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let found = assemble(&mut conn, row.into_iter().collect()).await?;
        Ok(found.into_iter().next())
    }

    async fn find_for_user(
        &self,
        user_id: &UserId,
        id: &OrderId,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<OrderRow> = orders::table
            .filter(orders::id.eq(id.as_uuid()))
            .filter(orders::user_id.eq(user_id.as_uuid()))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let found = assemble(&mut conn, row.into_iter().collect()).await?;
        Ok(found.into_iter().next())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::user_id.eq(user_id.as_uuid()))
            .order((orders::created_at.desc(), orders::id.asc()))
            .select(OrderRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        assemble(&mut conn, rows).await
    }
}
