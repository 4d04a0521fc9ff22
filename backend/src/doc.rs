//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health probes and the
//! session cookie security scheme. Domain types derive `ToSchema` directly,
//! so their schemas are named after the type (`Error`, `Order`, ...).
//!
//! The document backs Swagger UI in debug builds and is exported with
//! `cargo run --bin openapi-dump`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{JoinReceipt, ReorderOutcome};
use crate::domain::{
    CartItem, CartLine, CheckoutStart, Error, ErrorCode, GroupBuy, GroupBuyDetail, Order, Product,
    ProductPage, Profile, ProfileDetails, Totals, User,
};
use crate::inbound::http::cart::{
    AddCartItemBody, CartView, ClearCartResponse, QuantityUpdateResponse, RemovalResponse,
    UpdateQtyBody,
};
use crate::inbound::http::checkout::{ConfirmationResponse, ConfirmationState, WebhookAck};
use crate::inbound::http::group_buys::{CreateGroupBuyBody, GroupBuyList};
use crate::inbound::http::orders::ResendReceiptResponse;
use crate::inbound::http::users::{LoginRequest, UpdateProfileBody};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "FluxCart API",
        description = "Storefront API: catalog, cart, checkout, orders and group-buys."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::get_profile,
        crate::inbound::http::users::update_profile,
        crate::inbound::http::products::list_products,
        crate::inbound::http::products::list_categories,
        crate::inbound::http::products::get_product,
        crate::inbound::http::cart::get_cart,
        crate::inbound::http::cart::add_cart_item,
        crate::inbound::http::cart::update_cart_item,
        crate::inbound::http::cart::remove_cart_item,
        crate::inbound::http::cart::clear_cart,
        crate::inbound::http::checkout::create_checkout_session,
        crate::inbound::http::checkout::payment_webhook,
        crate::inbound::http::checkout::confirm_checkout,
        crate::inbound::http::orders::list_orders,
        crate::inbound::http::orders::get_order,
        crate::inbound::http::orders::reorder,
        crate::inbound::http::orders::resend_receipt,
        crate::inbound::http::group_buys::create_group_buy,
        crate::inbound::http::group_buys::join_group_buy,
        crate::inbound::http::group_buys::list_group_buys,
        crate::inbound::http::group_buys::get_group_buy,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        User,
        LoginRequest,
        Profile,
        ProfileDetails,
        UpdateProfileBody,
        Product,
        ProductPage,
        CartItem,
        CartLine,
        CartView,
        Totals,
        AddCartItemBody,
        UpdateQtyBody,
        QuantityUpdateResponse,
        RemovalResponse,
        ClearCartResponse,
        CheckoutStart,
        ConfirmationResponse,
        ConfirmationState,
        WebhookAck,
        Order,
        ReorderOutcome,
        ResendReceiptResponse,
        GroupBuy,
        GroupBuyDetail,
        GroupBuyList,
        CreateGroupBuyBody,
        JoinReceipt,
    )),
    tags(
        (name = "users", description = "Sign-in, sessions and profiles"),
        (name = "catalog", description = "Products and categories"),
        (name = "cart", description = "The caller's cart"),
        (name = "checkout", description = "Payment and order creation"),
        (name = "orders", description = "Order history"),
        (name = "group-buys", description = "Crowd purchase commitments"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
