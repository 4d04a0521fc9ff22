//! Shared helpers for storefront integration tests.

use fluxcart::domain::ports::AddCartItemRequest;
use fluxcart::domain::{AuthContext, CartItem, LineKind, Product, RentalWindow, UserIdentifier};
use fluxcart::test_support::shop::TestShop;

/// Sign `identifier` in through the login port and return its context.
pub(crate) async fn sign_in(shop: &TestShop, identifier: &str) -> AuthContext {
    let identifier = UserIdentifier::parse(identifier).expect("valid identifier");
    let user = shop
        .state
        .login
        .login(&identifier)
        .await
        .expect("login succeeds");
    AuthContext::new(user.id().clone())
}

/// Add `qty` of `product` to the caller's cart as a purchase.
pub(crate) async fn add_to_cart(
    shop: &TestShop,
    auth: &AuthContext,
    product: &Product,
    qty: u32,
) -> CartItem {
    shop.state
        .cart
        .add_item(AddCartItemRequest {
            auth: auth.clone(),
            product_id: product.id.clone(),
            qty,
            kind: LineKind::Buy,
            window: RentalWindow::default(),
            idempotency_key: None,
        })
        .await
        .expect("item added")
}
