//! Product search adapters.
//!
//! A thin HTTP implementation of the `ProductSearch` port against a
//! Meilisearch `products` index.

mod dto;
mod meilisearch;

pub use meilisearch::{MeilisearchConfig, MeilisearchSearch};
