//! Driving port for catalog reads.

use async_trait::async_trait;

use crate::domain::{Error, Product, ProductPage, ProductQuery};

/// Domain use-case port for browsing products.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    /// One page of products, ranked by search when a query is present.
    async fn list_products(&self, query: ProductQuery) -> Result<ProductPage, Error>;

    /// Distinct categories, ascending.
    async fn categories(&self) -> Result<Vec<String>, Error>;

    /// Product by slug, including its rental policy.
    async fn product_by_slug(&self, slug: &str) -> Result<Product, Error>;
}
