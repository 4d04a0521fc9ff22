//! Group-buy HTTP handlers.
//!
//! ```text
//! POST /api/v1/group-buys {"productId":"…","minParticipants":3,"deadline":"2026-05-02T12:00:00Z"}
//! POST /api/v1/group-buys/{id}/join
//! GET  /api/v1/group-buys?productId=…
//! GET  /api/v1/group-buys/{id}
//! ```

use actix_web::{HttpRequest, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{CreateGroupBuyRequest, JoinReceipt};
use crate::domain::{Error, GroupBuy, GroupBuyDetail, GroupBuyId, ProductId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_id, parse_rfc3339_timestamp,
};

const PRODUCT_ID: FieldName = FieldName::new("productId");
const MIN_PARTICIPANTS: FieldName = FieldName::new("minParticipants");
const DEADLINE: FieldName = FieldName::new("deadline");
const GROUP_BUY_ID: FieldName = FieldName::new("id");

/// Request payload for `POST /api/v1/group-buys`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupBuyBody {
    pub product_id: Option<String>,
    pub min_participants: Option<i64>,
    /// RFC 3339 instant after which joins close.
    pub deadline: Option<String>,
}

/// Query string of `GET /api/v1/group-buys`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct GroupBuyListParams {
    /// Product whose open group-buys to list.
    #[param(rename = "productId")]
    pub product_id: Option<String>,
}

/// Open group-buys for one product.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupBuyList {
    pub items: Vec<GroupBuy>,
}

fn group_buy_id_from(path: &str) -> Result<GroupBuyId, Error> {
    parse_id(path, GROUP_BUY_ID)
}

/// Open a group-buy for a product.
#[utoipa::path(
    post,
    path = "/api/v1/group-buys",
    request_body = CreateGroupBuyBody,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "UUID for idempotent requests")
    ),
    responses(
        (status = 200, description = "Group-buy opened", body = GroupBuy),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Product not found", body = Error)
    ),
    tags = ["group-buys"],
    operation_id = "createGroupBuy"
)]
#[post("/group-buys")]
pub async fn create_group_buy(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    payload: web::Json<CreateGroupBuyBody>,
) -> ApiResult<web::Json<GroupBuy>> {
    let auth = session.require_auth()?;
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let product_id: ProductId = payload
        .product_id
        .as_deref()
        .ok_or_else(|| missing_field_error(PRODUCT_ID))
        .and_then(|raw| parse_id(raw, PRODUCT_ID))?;
    let min_participants = payload
        .min_participants
        .ok_or_else(|| missing_field_error(MIN_PARTICIPANTS))?;
    let deadline = payload
        .deadline
        .as_deref()
        .ok_or_else(|| missing_field_error(DEADLINE))
        .and_then(|raw| parse_rfc3339_timestamp(raw, DEADLINE))?;
    let group_buy = state
        .group_buys
        .create(CreateGroupBuyRequest {
            auth,
            product_id,
            min_participants,
            deadline,
            idempotency_key,
        })
        .await?;
    Ok(web::Json(group_buy))
}

/// Join a group-buy. Joining twice is acknowledged, not duplicated.
#[utoipa::path(
    post,
    path = "/api/v1/group-buys/{id}/join",
    params(("id" = String, Path, description = "Group-buy id")),
    responses(
        (status = 200, description = "Joined", body = JoinReceipt),
        (status = 400, description = "Group-buy closed", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["group-buys"],
    operation_id = "joinGroupBuy"
)]
#[post("/group-buys/{id}/join")]
pub async fn join_group_buy(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<JoinReceipt>> {
    let auth = session.require_auth()?;
    let id = group_buy_id_from(path.as_str())?;
    Ok(web::Json(state.group_buys.join(&auth, &id).await?))
}

/// Open, unexpired group-buys for a product, soonest deadline first.
#[utoipa::path(
    get,
    path = "/api/v1/group-buys",
    params(GroupBuyListParams),
    responses(
        (status = 200, description = "Open group-buys", body = GroupBuyList),
        (status = 400, description = "productId missing or invalid", body = Error)
    ),
    tags = ["group-buys"],
    operation_id = "listGroupBuys",
    security([])
)]
#[get("/group-buys")]
pub async fn list_group_buys(
    state: web::Data<HttpState>,
    params: web::Query<GroupBuyListParams>,
) -> ApiResult<web::Json<GroupBuyList>> {
    let product_id: ProductId = params
        .product_id
        .as_deref()
        .ok_or_else(|| missing_field_error(PRODUCT_ID))
        .and_then(|raw| parse_id(raw, PRODUCT_ID))?;
    let items = state.group_buys_query.list_open(&product_id).await?;
    Ok(web::Json(GroupBuyList { items }))
}

/// One group-buy with its participants.
#[utoipa::path(
    get,
    path = "/api/v1/group-buys/{id}",
    params(("id" = String, Path, description = "Group-buy id")),
    responses(
        (status = 200, description = "Group-buy", body = GroupBuyDetail),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["group-buys"],
    operation_id = "getGroupBuy",
    security([])
)]
#[get("/group-buys/{id}")]
pub async fn get_group_buy(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<GroupBuyDetail>> {
    let id = group_buy_id_from(path.as_str())?;
    Ok(web::Json(state.group_buys_query.get(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{api_app, login_cookie};
    use crate::test_support::catalog::product;
    use crate::test_support::clock::fixture_now;
    use crate::test_support::shop::TestShop;
    use actix_web::cookie::Cookie;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::TimeDelta;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn hours_from_now(hours: i64) -> String {
        (fixture_now() + TimeDelta::hours(hours)).to_rfc3339()
    }

    async fn open_group_buy<S>(
        app: &S,
        cookie: &Cookie<'static>,
        body: Value,
    ) -> (StatusCode, Value)
    where
        S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    {
        let res = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/group-buys")
                .cookie(cookie.clone())
                .set_json(body)
                .to_request(),
        )
        .await;
        let status = res.status();
        (status, actix_test::read_body_json(res).await)
    }

    #[actix_web::test]
    async fn created_group_buys_are_listed_and_joinable() {
        let lamp = product("desk-lamp", 60_000);
        let lamp_id = lamp.id.to_string();
        let shop = TestShop::new(vec![lamp]);
        let app = actix_test::init_service(api_app(shop.state)).await;
        let creator = login_cookie(&app, "ada@example.com").await;
        let (status, created) = open_group_buy(
            &app,
            &creator,
            json!({ "productId": lamp_id, "minParticipants": 3, "deadline": hours_from_now(24) }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created.get("status").and_then(Value::as_str), Some("OPEN"));
        let id = created.get("id").and_then(Value::as_str).expect("id").to_owned();

        let joiner = login_cookie(&app, "grace@example.com").await;
        let join = || {
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/group-buys/{id}/join"))
                .cookie(joiner.clone())
                .to_request()
        };
        let first: Value = actix_test::call_and_read_body_json(&app, join()).await;
        let second: Value = actix_test::call_and_read_body_json(&app, join()).await;
        assert_eq!(first, json!({ "ok": true, "alreadyJoined": false }));
        assert_eq!(second, json!({ "ok": true, "alreadyJoined": true }));

        let listed: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/group-buys?productId={lamp_id}"))
                .to_request(),
        )
        .await;
        assert_eq!(listed.pointer("/items/0/id").and_then(Value::as_str), Some(id.as_str()));
        assert_eq!(
            listed.pointer("/items/0/participantCount").and_then(Value::as_u64),
            Some(1)
        );

        let detail: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/group-buys/{id}"))
                .to_request(),
        )
        .await;
        assert_eq!(
            detail.pointer("/participants").and_then(Value::as_array).map(Vec::len),
            Some(1)
        );
        assert_eq!(detail.get("minParticipants").and_then(Value::as_u64), Some(3));
    }

    #[rstest]
    #[case(json!({ "minParticipants": 3, "deadline": "2026-05-02T12:00:00Z" }), "productId", "missing_field")]
    #[case(json!({ "productId": "PRODUCT", "minParticipants": 0, "deadline": "2026-05-02T12:00:00Z" }), "minParticipants", "invalid_value")]
    #[case(json!({ "productId": "PRODUCT", "minParticipants": 2, "deadline": "tomorrow" }), "deadline", "invalid_timestamp")]
    #[case(json!({ "productId": "PRODUCT", "minParticipants": 2, "deadline": "2026-04-30T12:00:00Z" }), "deadline", "invalid_value")]
    #[actix_web::test]
    async fn invalid_group_buys_are_rejected(
        #[case] body: Value,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        let lamp = product("desk-lamp", 60_000);
        let body: Value = serde_json::from_str(
            &body.to_string().replace("PRODUCT", &lamp.id.to_string()),
        )
        .expect("json");
        let shop = TestShop::new(vec![lamp]);
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;

        let (status, error) = open_group_buy(&app, &cookie, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.pointer("/details/field").and_then(Value::as_str), Some(field));
        assert_eq!(error.pointer("/details/code").and_then(Value::as_str), Some(code));
    }

    #[actix_web::test]
    async fn listing_requires_a_product() {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/group-buys").to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body.pointer("/details/field").and_then(Value::as_str), Some("productId"));
    }

    #[actix_web::test]
    async fn expired_group_buys_refuse_joins() {
        let lamp = product("desk-lamp", 60_000);
        let lamp_id = lamp.id.to_string();
        let shop = TestShop::new(vec![lamp]);
        let clock = shop.clock.clone();
        let app = actix_test::init_service(api_app(shop.state)).await;
        let cookie = login_cookie(&app, "ada@example.com").await;
        let (_, created) = open_group_buy(
            &app,
            &cookie,
            json!({ "productId": lamp_id, "minParticipants": 2, "deadline": hours_from_now(1) }),
        )
        .await;
        let id = created.get("id").and_then(Value::as_str).expect("id");
        clock.advance_seconds(2 * 3600);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/group-buys/{id}/join"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            body.pointer("/details/code").and_then(Value::as_str),
            Some("group_buy_closed")
        );
    }

    #[actix_web::test]
    async fn unknown_group_buys_are_not_found() {
        let shop = TestShop::new(Vec::new());
        let app = actix_test::init_service(api_app(shop.state)).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/group-buys/{}", GroupBuyId::random()))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
