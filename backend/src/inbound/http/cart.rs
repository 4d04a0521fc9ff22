//! Cart HTTP handlers.
//!
//! ```text
//! GET    /api/v1/cart
//! POST   /api/v1/cart/items {"productId":"…","qty":1,"kind":"BUY"}
//! PATCH  /api/v1/cart/items/{id} {"qty":0}
//! DELETE /api/v1/cart/items/{id}
//! DELETE /api/v1/cart
//! ```

use std::str::FromStr;

use actix_web::{HttpRequest, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{AddCartItemRequest, QuantityUpdate};
use crate::domain::{
    CartItem, CartItemId, CartLine, Error, LineAmount, LineKind, ProductId, RentalWindow, Totals,
    compute_totals,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, missing_field_error, parse_id,
    parse_optional_rfc3339_timestamp,
};

const PRODUCT_ID: FieldName = FieldName::new("productId");
const CART_ITEM_ID: FieldName = FieldName::new("id");
const QTY: FieldName = FieldName::new("qty");
const KIND: FieldName = FieldName::new("kind");
const START_DATE: FieldName = FieldName::new("startDate");
const END_DATE: FieldName = FieldName::new("endDate");

/// Request payload for adding a cart line.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemBody {
    pub product_id: Option<String>,
    /// Defaults to 1.
    pub qty: Option<i64>,
    /// `BUY` (default), `RENT` or `SWAP`.
    pub kind: Option<String>,
    /// RFC 3339 rental start.
    pub start_date: Option<String>,
    /// RFC 3339 rental end.
    pub end_date: Option<String>,
}

/// Request payload for changing a line quantity; 0 deletes the line.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateQtyBody {
    pub qty: Option<i64>,
}

/// Cart contents with the totals checkout would charge.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub totals: Totals,
}

/// Result of a quantity change.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuantityUpdateResponse {
    pub ok: bool,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<CartItem>,
}

impl From<QuantityUpdate> for QuantityUpdateResponse {
    fn from(value: QuantityUpdate) -> Self {
        match value {
            QuantityUpdate::Updated(item) => Self {
                ok: true,
                deleted: false,
                item: Some(item),
            },
            QuantityUpdate::Deleted => Self {
                ok: true,
                deleted: true,
                item: None,
            },
        }
    }
}

/// Acknowledgement for removals.
#[derive(Debug, Serialize, ToSchema)]
pub struct RemovalResponse {
    pub ok: bool,
}

/// Number of lines removed by clearing the cart.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearCartResponse {
    pub removed: u64,
}

#[derive(Debug)]
struct ParsedAddItem {
    product_id: ProductId,
    qty: u32,
    kind: LineKind,
    window: RentalWindow,
}

fn parse_qty(raw: i64, min: u32) -> Result<u32, Error> {
    u32::try_from(raw)
        .ok()
        .filter(|qty| *qty >= min)
        .ok_or_else(|| {
            invalid_value_error(QTY, &raw.to_string(), format!("qty must be at least {min}"))
        })
}

fn parse_add_item(body: &AddCartItemBody) -> Result<ParsedAddItem, Error> {
    let product_id = body
        .product_id
        .as_deref()
        .ok_or_else(|| missing_field_error(PRODUCT_ID))
        .and_then(|raw| parse_id(raw, PRODUCT_ID))?;
    let qty = body.qty.map_or(Ok(1), |raw| parse_qty(raw, 1))?;
    let kind = body
        .kind
        .as_deref()
        .map(|raw| {
            LineKind::from_str(raw.trim())
                .map_err(|err| invalid_value_error(KIND, raw, err.to_string()))
        })
        .transpose()?
        .unwrap_or_default();
    let start = parse_optional_rfc3339_timestamp(body.start_date.as_deref(), START_DATE)?;
    let end = parse_optional_rfc3339_timestamp(body.end_date.as_deref(), END_DATE)?;
    let window = RentalWindow::new(start, end).map_err(|err| {
        invalid_value_error(
            END_DATE,
            body.end_date.as_deref().unwrap_or_default(),
            err.to_string(),
        )
    })?;
    Ok(ParsedAddItem {
        product_id,
        qty,
        kind,
        window,
    })
}

fn cart_totals(lines: &[CartLine]) -> Result<Totals, Error> {
    compute_totals(
        lines
            .iter()
            .map(|line| LineAmount::new(line.product.price_cents, line.item.qty)),
    )
    .map_err(|err| Error::internal(format!("cart cannot be priced: {err}")))
}

/// Current cart lines, oldest first, with totals.
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart contents", body = CartView),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["cart"],
    operation_id = "getCart"
)]
#[get("/cart")]
pub async fn get_cart(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<CartView>> {
    let auth = session.require_auth()?;
    let items = state.cart_query.list_items(&auth).await?;
    let totals = cart_totals(&items)?;
    Ok(web::Json(CartView { items, totals }))
}

/// Add a line to the cart. Identical requests still create distinct lines
/// unless they share an `Idempotency-Key`.
#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    request_body = AddCartItemBody,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "UUID for idempotent requests")
    ),
    responses(
        (status = 200, description = "Created line", body = CartItem),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Product not found", body = Error),
        (status = 409, description = "Idempotency key reused", body = Error)
    ),
    tags = ["cart"],
    operation_id = "addCartItem"
)]
#[post("/cart/items")]
pub async fn add_cart_item(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    payload: web::Json<AddCartItemBody>,
) -> ApiResult<web::Json<CartItem>> {
    let auth = session.require_auth()?;
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let parsed = parse_add_item(&payload)?;
    let item = state
        .cart
        .add_item(AddCartItemRequest {
            auth,
            product_id: parsed.product_id,
            qty: parsed.qty,
            kind: parsed.kind,
            window: parsed.window,
            idempotency_key,
        })
        .await?;
    Ok(web::Json(item))
}

/// Change a line's quantity; 0 removes the line.
#[utoipa::path(
    patch,
    path = "/api/v1/cart/items/{id}",
    params(("id" = String, Path, description = "Cart item id")),
    request_body = UpdateQtyBody,
    responses(
        (status = 200, description = "Updated or deleted", body = QuantityUpdateResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["cart"],
    operation_id = "updateCartItem"
)]
#[patch("/cart/items/{id}")]
pub async fn update_cart_item(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateQtyBody>,
) -> ApiResult<web::Json<QuantityUpdateResponse>> {
    let auth = session.require_auth()?;
    let item_id: CartItemId = parse_id(path.as_str(), CART_ITEM_ID)?;
    let qty = payload
        .qty
        .ok_or_else(|| missing_field_error(QTY))
        .and_then(|raw| parse_qty(raw, 0))?;
    let update = state.cart.set_qty(&auth, &item_id, qty).await?;
    Ok(web::Json(update.into()))
}

/// Remove one line.
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{id}",
    params(("id" = String, Path, description = "Cart item id")),
    responses(
        (status = 200, description = "Removed", body = RemovalResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["cart"],
    operation_id = "removeCartItem"
)]
#[delete("/cart/items/{id}")]
pub async fn remove_cart_item(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<RemovalResponse>> {
    let auth = session.require_auth()?;
    let item_id: CartItemId = parse_id(path.as_str(), CART_ITEM_ID)?;
    state.cart.remove_item(&auth, &item_id).await?;
    Ok(web::Json(RemovalResponse { ok: true }))
}

/// Remove every line of the caller's cart.
#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart cleared", body = ClearCartResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["cart"],
    operation_id = "clearCart"
)]
#[delete("/cart")]
pub async fn clear_cart(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ClearCartResponse>> {
    let auth = session.require_auth()?;
    let removed = state.cart.clear(&auth).await?;
    Ok(web::Json(ClearCartResponse { removed }))
}
