//! PostgreSQL-backed `ProductRepository` implementation using Diesel ORM.
//!
//! Products and their rental policies live in separate tables; policies are
//! fetched in one follow-up query per read and stitched on in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{ProductRepository, ProductRepositoryError};
use crate::domain::{
    DEFAULT_CURRENCY, Product, ProductId, ProductPage, ProductQuery, RentalPolicy,
};

use super::diesel_error_mapping::{map_basic_diesel_error, pool_error_message};
use super::models::{ProductRow, RentalPolicyRow};
use super::pool::{DbPool, PoolError};
use super::schema::{products, rental_policies};

/// Diesel-backed catalog reader.
#[derive(Clone)]
pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ProductRepositoryError {
    ProductRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> ProductRepositoryError {
    map_basic_diesel_error(
        error,
        ProductRepositoryError::query,
        ProductRepositoryError::connection,
    )
}

/// Escape `LIKE` wildcards so user text matches literally.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn to_policy(row: RentalPolicyRow) -> RentalPolicy {
    RentalPolicy {
        min_days: row.min_days,
        max_days: row.max_days,
        daily_price_cents: row.daily_price_cents,
        deposit_cents: row.deposit_cents,
    }
}

fn to_product(row: ProductRow, rental_policy: Option<RentalPolicy>) -> Product {
    let currency = if row.currency.trim().is_empty() {
        DEFAULT_CURRENCY.to_owned()
    } else {
        row.currency
    };
    Product {
        id: ProductId::from_uuid(row.id),
        slug: row.slug,
        title: row.title,
        description: row.description,
        price_cents: row.price_cents,
        currency,
        rating: row.rating,
        images: row.images,
        stock: row.stock,
        category: row.category,
        rental_policy,
        created_at: row.created_at,
    }
}

/// Attach rental policies to loaded product rows, preserving their order.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    rows: Vec<ProductRow>,
) -> Result<Vec<Product>, ProductRepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut policies: HashMap<Uuid, RentalPolicy> = rental_policies::table
        .filter(rental_policies::product_id.eq_any(&ids))
        .select(RentalPolicyRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?
        .into_iter()
        .map(|row| (row.product_id, to_policy(row)))
        .collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            let policy = policies.remove(&row.id);
            to_product(row, policy)
        })
        .collect())
}

#[async_trait]
impl ProductRepository for DieselProductRepository {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ProductRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut count_query = products::table.count().into_boxed();
        let mut page_query = products::table
            .select(ProductRow::as_select())
            .into_boxed();
        if let Some(text) = &query.text {
            let pattern = like_pattern(text);
            count_query = count_query.filter(
                products::title
                    .ilike(pattern.clone())
                    .or(products::description.ilike(pattern.clone())),
            );
            page_query = page_query.filter(
                products::title
                    .ilike(pattern.clone())
                    .or(products::description.ilike(pattern)),
            );
        }
        if let Some(category) = &query.category {
            count_query = count_query.filter(products::category.eq(category.clone()));
            page_query = page_query.filter(products::category.eq(category.clone()));
        }

        let total: i64 = count_query
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let rows: Vec<ProductRow> = page_query
            .order((products::created_at.desc(), products::id.asc()))
            .limit(i64::from(query.limit))
            .offset(i64::from(query.offset))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(ProductPage {
            items: hydrate(&mut conn, rows).await?,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ProductRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<ProductRow> = products::table
            .filter(products::id.eq_any(&uuids))
            .select(ProductRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        hydrate(&mut conn, rows).await
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, ProductRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProductRow> = products::table
            .find(id.as_uuid())
            .select(ProductRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let found = hydrate(&mut conn, row.into_iter().collect()).await?;
        Ok(found.into_iter().next())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, ProductRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProductRow> = products::table
            .filter(products::slug.eq(slug))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let found = hydrate(&mut conn, row.into_iter().collect()).await?;
        Ok(found.into_iter().next())
    }

    async fn categories(&self) -> Result<Vec<String>, ProductRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let categories: Vec<Option<String>> = products::table
            .filter(products::category.is_not_null())
            .select(products::category)
            .distinct()
            .order(products::category.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(categories.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for catalog row conversion.
    use super::*;
    use crate::test_support::clock::fixture_now;
    use rstest::rstest;

    #[rstest]
    #[case("lamp", "%lamp%")]
    #[case("50%_off", "%50\\%\\_off%")]
    #[case("a\\b", "%a\\\\b%")]
    fn like_patterns_escape_wildcards(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(like_pattern(text), expected);
    }

    #[rstest]
    fn blank_currencies_fall_back_to_the_default() {
        let row = ProductRow {
            id: Uuid::new_v4(),
            slug: "lamp".to_owned(),
            title: "Lamp".to_owned(),
            description: String::new(),
            price_cents: 1_000,
            currency: "  ".to_owned(),
            rating: 4.5,
            images: vec!["https://img.example/lamp.png".to_owned()],
            stock: 3,
            category: None,
            created_at: fixture_now(),
        };

        let product = to_product(row, None);

        assert_eq!(product.currency, DEFAULT_CURRENCY);
        assert!(!product.is_rentable());
    }
}
