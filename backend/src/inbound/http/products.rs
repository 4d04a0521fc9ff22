//! Catalog HTTP handlers.
//!
//! ```text
//! GET /api/v1/products?q=lamp&category=home&limit=24&offset=0
//! GET /api/v1/products/categories
//! GET /api/v1/products/{slug}
//! ```

use actix_web::{get, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{Error, Product, ProductPage, ProductQuery};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Query string of `GET /api/v1/products`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Free-text search over title and description.
    pub q: Option<String>,
    /// Exact category filter.
    pub category: Option<String>,
    /// Page size (default 24, capped at 100).
    pub limit: Option<u32>,
    /// Items to skip.
    pub offset: Option<u32>,
}

impl From<&ProductListParams> for ProductQuery {
    fn from(params: &ProductListParams) -> Self {
        Self::new(
            params.q.as_deref(),
            params.category.as_deref(),
            params.limit,
            params.offset,
        )
    }
}

/// List products, optionally searching and filtering by category.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "Product page", body = ProductPage),
        (status = 400, description = "Invalid request", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["catalog"],
    operation_id = "listProducts",
    security([])
)]
#[get("/products")]
pub async fn list_products(
    state: web::Data<HttpState>,
    params: web::Query<ProductListParams>,
) -> ApiResult<web::Json<ProductPage>> {
    let page = state
        .catalog
        .list_products(ProductQuery::from(&*params))
        .await?;
    Ok(web::Json(page))
}

/// Distinct product categories in ascending order.
#[utoipa::path(
    get,
    path = "/api/v1/products/categories",
    responses(
        (status = 200, description = "Categories", body = [String]),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["catalog"],
    operation_id = "listCategories",
    security([])
)]
#[get("/products/categories")]
pub async fn list_categories(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<String>>> {
    Ok(web::Json(state.catalog.categories().await?))
}

/// Fetch one product, including its rental policy.
#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Not found", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["catalog"],
    operation_id = "getProduct",
    security([])
)]
#[get("/products/{slug}")]
pub async fn get_product(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Product>> {
    let product = state.catalog.product_by_slug(path.as_str()).await?;
    Ok(web::Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_PAGE_SIZE;
    use crate::inbound::http::test_utils::api_app;
    use crate::test_support::catalog::{product, rentable_product};
    use crate::test_support::shop::TestShop;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::{fixture, rstest};
    use serde_json::Value;

    #[fixture]
    fn shop() -> TestShop {
        let mut rug = product("wool-rug", 50_000);
        rug.category = Some("decor".to_owned());
        TestShop::new(vec![
            product("desk-lamp", 60_000),
            rug,
            rentable_product("camera", 90_000),
        ])
    }

    async fn get_json(shop: TestShop, uri: &str) -> (StatusCode, Value) {
        let app = actix_test::init_service(api_app(shop.state)).await;
        let res =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;
        let status = res.status();
        (status, actix_test::read_body_json(res).await)
    }

    #[rstest]
    fn list_params_fall_back_to_defaults() {
        let query = ProductQuery::from(&ProductListParams::default());
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query.offset, 0);
        assert!(query.text.is_none());
    }

    #[rstest]
    #[actix_web::test]
    async fn listing_filters_by_text(shop: TestShop) {
        let (status, body) = get_json(shop, "/api/v1/products?q=LAMP").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("total").and_then(Value::as_u64), Some(1));
        assert_eq!(
            body.pointer("/items/0/slug").and_then(Value::as_str),
            Some("desk-lamp")
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn categories_are_distinct_and_sorted(shop: TestShop) {
        let (status, body) = get_json(shop, "/api/v1/products/categories").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(["decor", "home"]));
    }

    #[rstest]
    #[actix_web::test]
    async fn product_detail_includes_the_rental_policy(shop: TestShop) {
        let (status, body) = get_json(shop, "/api/v1/products/camera").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.pointer("/rentalPolicy/maxDays").and_then(Value::as_i64),
            Some(30)
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_slugs_are_not_found(shop: TestShop) {
        let (status, body) = get_json(shop, "/api/v1/products/ghost").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.get("code").and_then(Value::as_str), Some("not_found"));
    }
}
