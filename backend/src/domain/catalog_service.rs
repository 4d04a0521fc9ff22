//! Catalog browsing service.
//!
//! Text queries are ranked by the optional search engine and hydrated from
//! the product store in rank order. When the engine is absent or failing the
//! listing falls back to substring matching in the store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::port_error_mapping::map_product_error;
use super::ports::{CatalogQuery, ProductRepository, ProductSearch, SearchHits};
use super::{Error, Product, ProductPage, ProductQuery};

/// Catalog service implementing [`CatalogQuery`].
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    search: Option<Arc<dyn ProductSearch>>,
}

impl CatalogService {
    /// Create a service over the product store and an optional search engine.
    pub fn new(
        products: Arc<dyn ProductRepository>,
        search: Option<Arc<dyn ProductSearch>>,
    ) -> Self {
        Self { products, search }
    }

    async fn hydrate(&self, hits: SearchHits) -> Result<ProductPage, Error> {
        let found = self
            .products
            .find_by_ids(&hits.ids)
            .await
            .map_err(map_product_error)?;
        let mut by_id: HashMap<_, Product> = found
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();
        let items = hits
            .ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        Ok(ProductPage {
            items,
            total: hits.total,
        })
    }
}

#[async_trait]
impl CatalogQuery for CatalogService {
    async fn list_products(&self, query: ProductQuery) -> Result<ProductPage, Error> {
        if let (Some(search), Some(text)) = (&self.search, query.text.as_deref()) {
            match search.search(&query).await {
                Ok(hits) => return self.hydrate(hits).await,
                Err(error) => {
                    warn!(%error, query = text, "product search failed; falling back to substring match");
                }
            }
        }
        self.products
            .list(&query)
            .await
            .map_err(map_product_error)
    }

    async fn categories(&self) -> Result<Vec<String>, Error> {
        self.products
            .categories()
            .await
            .map_err(map_product_error)
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Product, Error> {
        self.products
            .find_by_slug(slug)
            .await
            .map_err(map_product_error)?
            .ok_or_else(|| Error::not_found(format!("product {slug} not found")))
    }
}

#[cfg(test)]
#[path = "catalog_service_tests.rs"]
mod tests;
