//! Port for the optional full-text product search engine.
//!
//! Search only ranks; products are always hydrated from the
//! [`ProductRepository`](super::ProductRepository). Callers treat every error
//! as a cue to fall back to substring matching.

use async_trait::async_trait;

use crate::domain::{ProductId, ProductQuery};

use super::define_port_error;

define_port_error! {
    /// Errors raised by search adapters.
    pub enum ProductSearchError {
        /// The engine could not be reached.
        Unavailable { message: String } => "product search unavailable: {message}",
        /// The engine answered with something unusable.
        InvalidResponse { message: String } => "product search returned an invalid response: {message}",
    }
}

/// Ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchHits {
    /// Matching product ids, best match first.
    pub ids: Vec<ProductId>,
    /// Estimated total number of matches.
    pub total: u64,
}

/// Full-text ranking of catalog products.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductSearch: Send + Sync {
    /// Rank products for `query.text`, honouring its category, limit and
    /// offset.
    async fn search(&self, query: &ProductQuery) -> Result<SearchHits, ProductSearchError>;
}
