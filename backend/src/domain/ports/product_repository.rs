//! Port for reading catalog products.

use async_trait::async_trait;

use crate::domain::{Product, ProductId, ProductPage, ProductQuery};

use super::define_port_error;

define_port_error! {
    /// Errors raised when reading products.
    pub enum ProductRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "product repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "product repository query failed: {message}",
    }
}

/// Read access to the catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// List products newest first, matching `query.text` as a case-insensitive
    /// substring of title or description and `query.category` exactly.
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ProductRepositoryError>;

    /// Fetch products by id. Missing ids are skipped; order is unspecified.
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ProductRepositoryError>;

    /// Fetch one product by id.
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, ProductRepositoryError>;

    /// Fetch one product by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, ProductRepositoryError>;

    /// Distinct non-null categories in ascending order.
    async fn categories(&self) -> Result<Vec<String>, ProductRepositoryError>;
}
