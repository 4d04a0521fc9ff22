//! PostgreSQL-backed `CartRepository` implementation using Diesel ORM.
//!
//! Every statement filters on the owning user as well as the line id, so a
//! foreign line id simply matches nothing.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{CartRepository, CartRepositoryError};
use crate::domain::{
    CartItem, CartItemId, CartLine, HoldId, LineKind, NewCartItem, ProductId, ProductSummary,
    RentalWindow, UserId,
};

use super::diesel_error_mapping::{DieselFailure, pool_error_message, rows_affected, to_u32};
use super::models::{CartItemRow, NewCartItemRow, ProductRow};
use super::pool::{DbPool, PoolError};
use super::schema::{cart_items, products};

/// Diesel-backed cart line storage.
#[derive(Clone)]
pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CartRepositoryError {
    CartRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> CartRepositoryError {
    match DieselFailure::from(error) {
        DieselFailure::ForeignKeyViolation { constraint } => CartRepositoryError::unknown_product(
            constraint.unwrap_or_else(|| "cart_items_product_id_fkey".to_owned()),
        ),
        DieselFailure::UniqueViolation { .. } => {
            CartRepositoryError::query("hold token already in use")
        }
        DieselFailure::Connection => CartRepositoryError::connection("database connection error"),
        DieselFailure::Query { message } => CartRepositoryError::query(message),
    }
}

fn stored_qty(qty: u32) -> Result<i32, CartRepositoryError> {
    i32::try_from(qty).map_err(|_| CartRepositoryError::query("quantity out of range"))
}

fn to_new_row(item: &NewCartItem) -> Result<NewCartItemRow<'_>, CartRepositoryError> {
    Ok(NewCartItemRow {
        id: Uuid::new_v4(),
        user_id: *item.user_id.as_uuid(),
        product_id: *item.product_id.as_uuid(),
        qty: stored_qty(item.qty)?,
        kind: item.kind.as_str(),
        start_date: item.window.start_date,
        end_date: item.window.end_date,
        hold_id: item.hold_id.as_ref(),
    })
}

fn to_cart_item(row: CartItemRow) -> Result<CartItem, CartRepositoryError> {
    let kind = LineKind::from_str(&row.kind)
        .map_err(|err| CartRepositoryError::query(format!("invalid line kind in database: {err}")))?;
    Ok(CartItem {
        id: CartItemId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        product_id: ProductId::from_uuid(row.product_id),
        qty: to_u32(row.qty),
        kind,
        window: RentalWindow {
            start_date: row.start_date,
            end_date: row.end_date,
        },
        hold_id: HoldId::from_stored(row.hold_id),
        created_at: row.created_at,
    })
}

pub(crate) fn to_summary(row: &ProductRow) -> ProductSummary {
    ProductSummary {
        id: ProductId::from_uuid(row.id),
        slug: row.slug.clone(),
        title: row.title.clone(),
        image: row.images.iter().next().cloned(),
        price_cents: row.price_cents,
        currency: row.currency.clone(),
    }
}

#[async_trait]
impl CartRepository for DieselCartRepository {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CartLine>, CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CartItemRow> = cart_items::table
            .filter(cart_items::user_id.eq(user_id.as_uuid()))
            .order((cart_items::created_at.asc(), cart_items::id.asc()))
            .select(CartItemRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<Uuid> = rows.iter().map(|row| row.product_id).collect();
        let summaries: HashMap<Uuid, ProductSummary> = products::table
            .filter(products::id.eq_any(&product_ids))
            .select(ProductRow::as_select())
            .load::<ProductRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .iter()
            .map(|row| (row.id, to_summary(row)))
            .collect();

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(product) = summaries.get(&row.product_id).cloned() else {
                warn!(cart_item_id = %row.id, product_id = %row.product_id, "cart line without product skipped");
                continue;
            };
            lines.push(CartLine {
                item: to_cart_item(row)?,
                product,
            });
        }
        Ok(lines)
    }

    async fn insert(&self, item: &NewCartItem) -> Result<CartItem, CartRepositoryError> {
        let new_row = to_new_row(item)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: CartItemRow = diesel::insert_into(cart_items::table)
            .values(&new_row)
            .returning(CartItemRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_cart_item(row)
    }

    async fn insert_many(&self, items: &[NewCartItem]) -> Result<u64, CartRepositoryError> {
        if items.is_empty() {
            return Ok(0);
        }
        let new_rows = items
            .iter()
            .map(to_new_row)
            .collect::<Result<Vec<_>, _>>()?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let inserted = diesel::insert_into(cart_items::table)
            .values(&new_rows)
            .on_conflict(cart_items::hold_id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows_affected(inserted))
    }

    async fn update_qty(
        &self,
        user_id: &UserId,
        item_id: &CartItemId,
        qty: u32,
    ) -> Result<Option<CartItem>, CartRepositoryError> {
        let stored = stored_qty(qty)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CartItemRow> = diesel::update(
            cart_items::table
                .filter(cart_items::id.eq(item_id.as_uuid()))
                .filter(cart_items::user_id.eq(user_id.as_uuid())),
        )
        .set(cart_items::qty.eq(stored))
        .returning(CartItemRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        row.map(to_cart_item).transpose()
    }

    async fn delete(
        &self,
        user_id: &UserId,
        item_id: &CartItemId,
    ) -> Result<bool, CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq(item_id.as_uuid()))
                .filter(cart_items::user_id.eq(user_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn delete_many(
        &self,
        user_id: &UserId,
        item_ids: &[CartItemId],
    ) -> Result<u64, CartRepositoryError> {
        if item_ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = item_ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq_any(&ids))
                .filter(cart_items::user_id.eq(user_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(rows_affected(deleted))
    }

    async fn clear(&self, user_id: &UserId) -> Result<u64, CartRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(cart_items::table.filter(cart_items::user_id.eq(user_id.as_uuid())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows_affected(deleted))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for cart row conversion and error mapping.
    use super::*;
    use crate::test_support::clock::fixture_now;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    fn row(kind: &str) -> CartItemRow {
        CartItemRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            qty: 2,
            kind: kind.to_owned(),
            start_date: None,
            end_date: None,
            hold_id: "hold_abc".to_owned(),
            created_at: fixture_now(),
        }
    }

    #[rstest]
    fn rows_convert_to_cart_items() {
        let item = to_cart_item(row("RENT")).expect("valid row");
        assert_eq!(item.kind, LineKind::Rent);
        assert_eq!(item.qty, 2);
        assert_eq!(item.hold_id.as_ref(), "hold_abc");
    }

    #[rstest]
    fn unknown_kinds_are_query_errors() {
        let error = to_cart_item(row("LEASE")).expect_err("invalid kind");
        assert!(matches!(error, CartRepositoryError::Query { .. }));
    }

    #[rstest]
    fn foreign_key_violations_mean_unknown_products() {
        let error = map_diesel_error(DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("violates foreign key".to_owned()),
        ));
        assert!(matches!(error, CartRepositoryError::UnknownProduct { .. }));
    }

    fn product_row(images: &[&str]) -> ProductRow {
        ProductRow {
            id: Uuid::new_v4(),
            slug: "brass-lamp".to_owned(),
            title: "Brass lamp".to_owned(),
            description: String::new(),
            price_cents: 4_500,
            currency: "INR".to_owned(),
            rating: 4.5,
            images: images.iter().map(|url| (*url).to_owned()).collect(),
            stock: 3,
            category: None,
            created_at: fixture_now(),
        }
    }

    #[rstest]
    #[case::gallery(&["https://img/1.jpg", "https://img/2.jpg"], Some("https://img/1.jpg"))]
    #[case::no_images(&[], None)]
    fn summaries_lead_with_the_first_image(
        #[case] images: &[&str],
        #[case] expected: Option<&str>,
    ) {
        let summary = to_summary(&product_row(images));

        assert_eq!(summary.image.as_deref(), expected);
        assert_eq!(summary.price_cents, 4_500);
    }
}
