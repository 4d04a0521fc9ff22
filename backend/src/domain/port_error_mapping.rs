//! Translation of driven-port failures into domain errors.
//!
//! Connection failures become `service_unavailable` so clients may retry;
//! everything else is an internal error and is redacted at the HTTP boundary.

use serde_json::json;

use super::Error;
use super::ports::{
    CartRepositoryError, CheckoutSessionRepositoryError, GroupBuyRepositoryError,
    OrderRepositoryError, PaymentGatewayError, ProductRepositoryError, UserDirectoryError,
};

pub(crate) fn map_product_error(error: ProductRepositoryError) -> Error {
    match error {
        ProductRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("product repository unavailable: {message}"))
        }
        ProductRepositoryError::Query { message } => {
            Error::internal(format!("product repository error: {message}"))
        }
    }
}

pub(crate) fn map_cart_error(error: CartRepositoryError) -> Error {
    match error {
        CartRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("cart repository unavailable: {message}"))
        }
        CartRepositoryError::Query { message } => {
            Error::internal(format!("cart repository error: {message}"))
        }
        CartRepositoryError::UnknownProduct { .. } => Error::not_found("product not found"),
    }
}

pub(crate) fn map_order_error(error: OrderRepositoryError) -> Error {
    match error {
        OrderRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("order repository unavailable: {message}"))
        }
        OrderRepositoryError::Query { message } => {
            Error::internal(format!("order repository error: {message}"))
        }
        OrderRepositoryError::DuplicateReference { reference } => {
            Error::conflict(format!("an order already exists for {reference}"))
        }
    }
}

pub(crate) fn map_session_error(error: CheckoutSessionRepositoryError) -> Error {
    match error {
        CheckoutSessionRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("checkout session store unavailable: {message}"))
        }
        CheckoutSessionRepositoryError::Query { message }
        | CheckoutSessionRepositoryError::Serialization { message } => {
            Error::internal(format!("checkout session store error: {message}"))
        }
    }
}

pub(crate) fn map_group_buy_error(error: GroupBuyRepositoryError) -> Error {
    match error {
        GroupBuyRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("group-buy repository unavailable: {message}"))
        }
        GroupBuyRepositoryError::Query { message } => {
            Error::internal(format!("group-buy repository error: {message}"))
        }
        GroupBuyRepositoryError::UnknownProduct { .. } => Error::not_found("product not found"),
    }
}

pub(crate) fn map_user_error(error: UserDirectoryError) -> Error {
    match error {
        UserDirectoryError::Connection { message } => {
            Error::service_unavailable(format!("user directory unavailable: {message}"))
        }
        UserDirectoryError::Query { message } => {
            Error::internal(format!("user directory error: {message}"))
        }
        UserDirectoryError::PhoneTaken { .. } => {
            Error::conflict("phone is already in use by another account").with_details(json!({
                "field": "phone",
                "code": "phone_taken",
            }))
        }
    }
}

pub(crate) fn map_gateway_error(error: PaymentGatewayError) -> Error {
    match error {
        PaymentGatewayError::Unavailable { message }
        | PaymentGatewayError::InvalidResponse { message } => {
            Error::service_unavailable(format!("payment provider unavailable: {message}"))
        }
        PaymentGatewayError::Rejected { message } => {
            Error::invalid_request(format!("payment provider rejected the request: {message}"))
        }
        PaymentGatewayError::InvalidSignature { .. } => {
            Error::invalid_request("invalid webhook signature")
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(map_cart_error(CartRepositoryError::connection("down")), ErrorCode::ServiceUnavailable)]
    #[case(map_cart_error(CartRepositoryError::query("bad")), ErrorCode::InternalError)]
    #[case(map_cart_error(CartRepositoryError::unknown_product("p")), ErrorCode::NotFound)]
    #[case(map_order_error(OrderRepositoryError::duplicate_reference("r")), ErrorCode::Conflict)]
    #[case(map_gateway_error(PaymentGatewayError::invalid_signature("stale")), ErrorCode::InvalidRequest)]
    #[case(map_gateway_error(PaymentGatewayError::unavailable("timeout")), ErrorCode::ServiceUnavailable)]
    #[case(map_group_buy_error(GroupBuyRepositoryError::unknown_product("p")), ErrorCode::NotFound)]
    #[case(map_user_error(UserDirectoryError::phone_taken("+919876543210")), ErrorCode::Conflict)]
    fn maps_port_failures_to_error_codes(#[case] error: Error, #[case] expected: ErrorCode) {
        assert_eq!(error.code(), expected);
    }
}
