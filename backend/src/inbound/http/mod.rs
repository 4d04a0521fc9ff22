//! HTTP inbound adapter exposing REST endpoints.
//!
//! Handlers live under `/api/v1`; [`configure_api`] registers all of them so
//! the server and tests mount the same surface.

pub mod cart;
pub mod checkout;
pub mod error;
pub mod group_buys;
pub mod health;
pub mod idempotency;
pub mod orders;
pub mod products;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` handler on a scope or app.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use fluxcart::inbound::http::configure_api;
///
/// let app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(error::json_config())
        .app_data(error::query_config())
        .service(users::login)
        .service(users::logout)
        .service(users::get_profile)
        .service(users::update_profile)
        .service(products::list_products)
        .service(products::list_categories)
        .service(products::get_product)
        .service(cart::get_cart)
        .service(cart::add_cart_item)
        .service(cart::update_cart_item)
        .service(cart::remove_cart_item)
        .service(cart::clear_cart)
        .service(checkout::create_checkout_session)
        .service(checkout::payment_webhook)
        .service(checkout::confirm_checkout)
        .service(orders::list_orders)
        .service(orders::get_order)
        .service(orders::reorder)
        .service(orders::resend_receipt)
        .service(group_buys::create_group_buy)
        .service(group_buys::join_group_buy)
        .service(group_buys::list_group_buys)
        .service(group_buys::get_group_buy);
}
