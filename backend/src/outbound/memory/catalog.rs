//! Catalog reads over the in-memory product list.

use std::cmp::Reverse;

use async_trait::async_trait;

use crate::domain::ports::{ProductRepository, ProductRepositoryError};
use crate::domain::{Product, ProductId, ProductPage, ProductQuery};

use super::MemoryStore;

fn matches_text(product: &Product, needle: &str) -> bool {
    product.title.to_lowercase().contains(needle)
        || product.description.to_lowercase().contains(needle)
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ProductRepositoryError> {
        let needle = query.text.as_deref().map(str::to_lowercase);
        self.with_state(ProductRepositoryError::connection, |state| {
            let mut matching: Vec<&Product> = state
                .products
                .iter()
                .filter(|product| needle.as_deref().is_none_or(|text| matches_text(product, text)))
                .filter(|product| {
                    query
                        .category
                        .as_deref()
                        .is_none_or(|category| product.category.as_deref() == Some(category))
                })
                .collect();
            matching.sort_by_key(|product| (Reverse(product.created_at), product.id.clone()));
            let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
            let items = matching
                .into_iter()
                .skip(to_usize(query.offset))
                .take(to_usize(query.limit))
                .cloned()
                .collect();
            Ok(ProductPage { items, total })
        })
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ProductRepositoryError> {
        self.with_state(ProductRepositoryError::connection, |state| {
            Ok(state
                .products
                .iter()
                .filter(|product| ids.contains(&product.id))
                .cloned()
                .collect())
        })
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, ProductRepositoryError> {
        self.with_state(ProductRepositoryError::connection, |state| {
            Ok(state.products.iter().find(|product| &product.id == id).cloned())
        })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, ProductRepositoryError> {
        self.with_state(ProductRepositoryError::connection, |state| {
            Ok(state
                .products
                .iter()
                .find(|product| product.slug == slug)
                .cloned())
        })
    }

    async fn categories(&self) -> Result<Vec<String>, ProductRepositoryError> {
        self.with_state(ProductRepositoryError::connection, |state| {
            let mut categories: Vec<String> = state
                .products
                .iter()
                .filter_map(|product| product.category.clone())
                .collect();
            categories.sort();
            categories.dedup();
            Ok(categories)
        })
    }
}
