//! Catalog products and rental policies.
//!
//! Products are maintained by import tooling; this service only reads them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::ProductId;

/// Currency assumed when a product does not carry one.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Terms under which a product can be rented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalPolicy {
    /// Shortest rental period in days.
    pub min_days: i32,
    /// Longest rental period in days.
    pub max_days: i32,
    /// Price per rental day in minor units.
    pub daily_price_cents: i64,
    /// Refundable deposit in minor units.
    pub deposit_cents: i64,
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable identifier.
    #[schema(value_type = String)]
    pub id: ProductId,
    /// Unique URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Long description.
    pub description: String,
    /// Live unit price in minor units.
    pub price_cents: i64,
    /// ISO currency code.
    pub currency: String,
    /// Average rating.
    pub rating: f64,
    /// Ordered image URLs.
    pub images: Vec<String>,
    /// Units in stock.
    pub stock: i32,
    /// Optional category label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Present when the product can be rented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_policy: Option<RentalPolicy>,
    /// When the product was added.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Condensed view embedded in cart lines and order items.
    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            image: self.images.first().cloned(),
            price_cents: self.price_cents,
            currency: self.currency.clone(),
        }
    }

    /// Whether the product carries a rental policy.
    #[must_use]
    pub const fn is_rentable(&self) -> bool {
        self.rental_policy.is_some()
    }
}

/// Condensed product reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Stable identifier.
    #[schema(value_type = String)]
    pub id: ProductId,
    /// URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// First image, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Live unit price in minor units.
    pub price_cents: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Default page size for product listings.
pub const DEFAULT_PAGE_SIZE: u32 = 24;
/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filters for a product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    /// Free-text search, trimmed and non-empty when present.
    pub text: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    /// Page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub limit: u32,
    /// Rows to skip.
    pub offset: u32,
}

impl ProductQuery {
    /// Normalise raw listing parameters.
    ///
    /// Blank text and categories are dropped and the limit is clamped.
    #[must_use]
    pub fn new(
        text: Option<&str>,
        category: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Self {
        let non_blank = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|trimmed| !trimmed.is_empty())
                .map(str::to_owned)
        };
        Self {
            text: non_blank(text),
            category: non_blank(category),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductPage {
    /// Products on this page.
    pub items: Vec<Product>,
    /// Total matching products.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, DEFAULT_PAGE_SIZE)]
    #[case(Some(0), 1)]
    #[case(Some(500), MAX_PAGE_SIZE)]
    #[case(Some(12), 12)]
    fn clamps_page_size(#[case] requested: Option<u32>, #[case] expected: u32) {
        let query = ProductQuery::new(None, None, requested, None);
        assert_eq!(query.limit, expected);
    }

    #[rstest]
    fn drops_blank_filters() {
        let query = ProductQuery::new(Some("   "), Some(""), None, Some(48));
        assert!(query.text.is_none());
        assert!(query.category.is_none());
        assert_eq!(query.offset, 48);
    }
}
