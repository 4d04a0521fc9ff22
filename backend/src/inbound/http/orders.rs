//! Order history handlers.
//!
//! ```text
//! GET  /api/v1/orders
//! GET  /api/v1/orders/{id}
//! POST /api/v1/orders/{id}/reorder
//! POST /api/v1/orders/{id}/resend-receipt
//! ```

use actix_web::{HttpRequest, get, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ports::{ReorderOutcome, ReorderRequest};
use crate::domain::{Error, Order, OrderId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const ORDER_ID: FieldName = FieldName::new("id");

/// Acknowledgement that a receipt was queued.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResendReceiptResponse {
    pub ok: bool,
}

fn order_id_from(path: &str) -> Result<OrderId, Error> {
    parse_id(path, ORDER_ID)
}

/// The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders", body = [Order]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["orders"],
    operation_id = "listOrders"
)]
#[get("/orders")]
pub async fn list_orders(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<Order>>> {
    let auth = session.require_auth()?;
    Ok(web::Json(state.orders_query.list_orders(&auth).await?))
}

/// One order with its captured lines.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 400, description = "Invalid id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["orders"],
    operation_id = "getOrder"
)]
#[get("/orders/{id}")]
pub async fn get_order(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Order>> {
    let auth = session.require_auth()?;
    let order_id = order_id_from(path.as_str())?;
    Ok(web::Json(
        state.orders_query.get_order(&auth, &order_id).await?,
    ))
}

/// Copy the order's BUY lines back into the cart.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/reorder",
    params(
        ("id" = String, Path, description = "Order id"),
        ("Idempotency-Key" = Option<String>, Header, description = "UUID for idempotent requests")
    ),
    responses(
        (status = 200, description = "Lines added", body = ReorderOutcome),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Idempotency key reused", body = Error)
    ),
    tags = ["orders"],
    operation_id = "reorder"
)]
#[post("/orders/{id}/reorder")]
pub async fn reorder(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReorderOutcome>> {
    let auth = session.require_auth()?;
    let order_id = order_id_from(path.as_str())?;
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let outcome = state
        .orders
        .reorder(ReorderRequest {
            auth,
            order_id,
            idempotency_key,
        })
        .await?;
    Ok(web::Json(outcome))
}

/// Queue the order confirmation email again.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/resend-receipt",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Receipt queued", body = ResendReceiptResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["orders"],
    operation_id = "resendReceipt"
)]
#[post("/orders/{id}/resend-receipt")]
pub async fn resend_receipt(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ResendReceiptResponse>> {
    let auth = session.require_auth()?;
    let order_id = order_id_from(path.as_str())?;
    state.orders.resend_receipt(&auth, &order_id).await?;
    Ok(web::Json(ResendReceiptResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockOrderCommand;
    use crate::inbound::http::test_utils::{api_app, login_cookie};
    use crate::test_support::catalog::product;
    use crate::test_support::shop::TestShop;
    use actix_web::cookie::Cookie;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn place_order<S>(app: &S, cookie: &Cookie<'static>, product_id: &str, qty: u32) -> String
    where
        S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    {
        let added = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/cart/items")
                .cookie(cookie.clone())
                .set_json(json!({ "productId": product_id, "qty": qty }))
                .to_request(),
        )
        .await;
        assert_eq!(added.status(), StatusCode::OK);
        let start: Value = actix_test::call_and_read_body_json(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/checkout/session")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        start
            .get("orderId")
            .and_then(Value::as_str)
            .expect("simulated order")
            .to_owned()
    }

    #[actix_web::test]
    async fn orders_are_listed_newest_first() {
        let lamp = product("desk-lamp", 60_000);
        let lamp_id = lamp.id.to_string();
        let shop = TestShop::new(vec![lamp]);
        let clock = shop.clock.clone();
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;
        let first = place_order(&app, &cookie, &lamp_id, 1).await;
        clock.advance_seconds(60);
        let second = place_order(&app, &cookie, &lamp_id, 2).await;

        let orders: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/orders")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        let ids: Vec<&str> = orders
            .as_array()
            .expect("order array")
            .iter()
            .filter_map(|order| order.get("id").and_then(Value::as_str))
            .collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
        assert!(orders.pointer("/0/userId").is_none());
    }

    #[actix_web::test]
    async fn orders_of_other_users_are_not_found() {
        let lamp = product("desk-lamp", 60_000);
        let lamp_id = lamp.id.to_string();
        let shop = TestShop::new(vec![lamp]);
        let app = actix_test::init_service(api_app(shop.state)).await;
        let owner = login_cookie(&app, "ada@example.com").await;
        let order_id = place_order(&app, &owner, &lamp_id, 1).await;
        let intruder = login_cookie(&app, "grace@example.com").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/orders/{order_id}"))
                .cookie(intruder)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn reorder_refills_the_cart() {
        let lamp = product("desk-lamp", 60_000);
        let lamp_id = lamp.id.to_string();
        let shop = TestShop::new(vec![lamp]);
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;
        let order_id = place_order(&app, &cookie, &lamp_id, 3).await;

        let outcome: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/orders/{order_id}/reorder"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        let cart: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/cart")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(outcome, json!({ "added": 1 }));
        assert_eq!(cart.pointer("/items/0/qty").and_then(Value::as_u64), Some(3));
    }

    #[actix_web::test]
    async fn resend_receipt_notifies_again() {
        let lamp = product("desk-lamp", 60_000);
        let lamp_id = lamp.id.to_string();
        let shop = TestShop::new(vec![lamp]);
        let notifier = shop.notifier.clone();
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;
        let order_id = place_order(&app, &cookie, &lamp_id, 1).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/orders/{order_id}/resend-receipt"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let notified: Vec<String> = notifier.notified().iter().map(ToString::to_string).collect();
        assert_eq!(notified, vec![order_id.clone(), order_id]);
    }

    #[rstest]
    #[case("/api/v1/orders/not-a-uuid")]
    #[case("/api/v1/orders/not-a-uuid/reorder")]
    #[actix_web::test]
    async fn malformed_ids_are_rejected_before_the_port(#[case] uri: &str) {
        let mut orders = MockOrderCommand::new();
        orders.expect_reorder().never();
        let shop = TestShop::new(Vec::new());
        let state = HttpState {
            orders: Arc::new(orders),
            ..shop.state
        };
        let app = actix_test::init_service(api_app(state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;
        let request = if uri.ends_with("reorder") {
            actix_test::TestRequest::post()
        } else {
            actix_test::TestRequest::get()
        };

        let res = actix_test::call_service(&app, request.uri(uri).cookie(cookie).to_request()).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.pointer("/details/code").and_then(Value::as_str), Some("invalid_uuid"));
    }
}
