//! Reqwest-backed Meilisearch adapter.
//!
//! This adapter owns transport details only. Every failure surfaces as a
//! [`ProductSearchError`] so the catalog service can fall back to substring
//! matching.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::{SearchRequestDto, SearchResponseDto};
use crate::domain::ProductQuery;
use crate::domain::ports::{ProductSearch, ProductSearchError, SearchHits};

const PRODUCTS_INDEX: &str = "products";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Location and credentials of the search engine.
pub struct MeilisearchConfig {
    /// Engine base URL.
    pub url: Url,
    /// Optional API key, sent as a bearer token.
    pub api_key: Option<Zeroizing<String>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl MeilisearchConfig {
    /// Configuration for `url` without a key and with the default timeout.
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self {
            url,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Search adapter that queries the `products` index.
pub struct MeilisearchSearch {
    client: Client,
    endpoint: Url,
    api_key: Option<Zeroizing<String>>,
}

impl MeilisearchSearch {
    /// Build an adapter using a reqwest client with the configured timeout.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed or the
    /// base URL cannot carry a path.
    pub fn new(config: MeilisearchConfig) -> Result<Self, ProductSearchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ProductSearchError::unavailable(err.to_string()))?;
        let endpoint = search_endpoint(config.url)?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
        })
    }
}

fn search_endpoint(base: Url) -> Result<Url, ProductSearchError> {
    let mut endpoint = base;
    endpoint
        .path_segments_mut()
        .map_err(|()| ProductSearchError::unavailable("search URL cannot take a path"))?
        .pop_if_empty()
        .extend(["indexes", PRODUCTS_INDEX, "search"]);
    Ok(endpoint)
}

#[async_trait]
impl ProductSearch for MeilisearchSearch {
    async fn search(&self, query: &ProductQuery) -> Result<SearchHits, ProductSearchError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&SearchRequestDto::from_query(query));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.as_str());
        }
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let decoded: SearchResponseDto = serde_json::from_slice(body.as_ref()).map_err(|err| {
            ProductSearchError::invalid_response(format!("invalid search JSON payload: {err}"))
        })?;
        decoded
            .into_hits()
            .map_err(ProductSearchError::invalid_response)
    }
}

fn map_transport_error(error: reqwest::Error) -> ProductSearchError {
    ProductSearchError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode) -> ProductSearchError {
    let message = format!("status {}", status.as_u16());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ProductSearchError::unavailable(message)
    } else {
        ProductSearchError::invalid_response(message)
    }
}
