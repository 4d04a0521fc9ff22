//! Tests for rendering domain errors over HTTP.

use actix_web::body::to_bytes;
use actix_web::test as actix_test;
use actix_web::{App, HttpResponse};
use rstest::rstest;
use serde::Deserialize;
use serde_json::{Value, json};

use super::*;

const TRACE_ID: &str = "6b1f3c1e-0b4a-4a3e-9d8c-2f6a0e5b7c11";

async fn render(error: &Error) -> (StatusCode, Option<String>, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body()).await.expect("body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, header, body)
}

#[rstest]
#[case::bad_quantity(Error::invalid_request("qty must be at least 1"), StatusCode::BAD_REQUEST)]
#[case::no_session(Error::unauthorized("login required"), StatusCode::UNAUTHORIZED)]
#[case::forbidden(Error::forbidden("not yours"), StatusCode::FORBIDDEN)]
#[case::foreign_order(Error::not_found("order not found"), StatusCode::NOT_FOUND)]
#[case::key_reuse(Error::conflict("idempotency key reused"), StatusCode::CONFLICT)]
#[case::provider_down(
    Error::service_unavailable("payment provider unavailable"),
    StatusCode::SERVICE_UNAVAILABLE
)]
#[case::bug(Error::internal("pool exhausted"), StatusCode::INTERNAL_SERVER_ERROR)]
fn codes_map_to_statuses(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(error.status_code(), status);
}

#[rstest]
#[actix_web::test]
async fn closed_group_buy_keeps_its_details() {
    let error = Error::invalid_request("group-buy is closed")
        .with_trace_id(TRACE_ID)
        .with_details(json!({ "code": "group_buy_closed" }));

    let (status, header, body) = render(&error).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["message"], "group-buy is closed");
    assert_eq!(body["details"]["code"], "group_buy_closed");
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted_but_traceable() {
    let error = Error::internal("duplicate key value violates constraint orders_pkey")
        .with_trace_id(TRACE_ID)
        .with_details(json!({ "sql": "INSERT INTO orders" }));

    let (status, header, body) = render(&error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(body["message"], REDACTED_MESSAGE);
    assert_eq!(body["traceId"], TRACE_ID);
    assert!(body.get("details").is_none());
}

#[rstest]
#[actix_web::test]
async fn unavailable_collaborators_lose_adapter_details() {
    let error = Error::service_unavailable("payment provider unavailable")
        .with_details(json!({ "endpoint": "https://api.stripe.com/v1/checkout/sessions" }));

    let (status, header, body) = render(&error).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(header.is_none());
    assert_eq!(body["message"], "payment provider unavailable");
    assert!(body.get("details").is_none());
}

#[derive(Deserialize)]
struct Quantity {
    #[expect(dead_code, reason = "only the extraction outcome matters")]
    qty: u32,
}

#[derive(Deserialize)]
struct Listing {
    #[expect(dead_code, reason = "only the extraction outcome matters")]
    limit: u32,
}

#[rstest]
#[actix_web::test]
async fn malformed_bodies_and_queries_use_the_error_payload() {
    let app = actix_test::init_service(
        App::new()
            .app_data(json_config())
            .app_data(query_config())
            .route(
                "/qty",
                web::post().to(|_: web::Json<Quantity>| async { HttpResponse::Ok() }),
            )
            .route(
                "/list",
                web::get().to(|_: web::Query<Listing>| async { HttpResponse::Ok() }),
            ),
    )
    .await;

    let body_res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/qty")
            .insert_header(("content-type", "application/json"))
            .set_payload(r#"{"qty": "two"}"#)
            .to_request(),
    )
    .await;
    assert_eq!(body_res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(body_res).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["code"], "invalid_body");

    let query_res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get().uri("/list?limit=many").to_request(),
    )
    .await;
    assert_eq!(query_res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(query_res).await;
    assert_eq!(body["details"]["code"], "invalid_query");
}
