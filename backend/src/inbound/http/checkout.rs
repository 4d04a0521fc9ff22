//! Checkout HTTP handlers.
//!
//! ```text
//! POST /api/v1/checkout/session
//! POST /api/v1/webhooks/payment
//! GET  /api/v1/checkout/confirm?ref=cs_test_1
//! ```

use actix_web::{HttpRequest, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::StartCheckoutRequest;
use crate::domain::{CheckoutStart, ConfirmationOutcome, Error, OrderId, PaymentReference};
use crate::inbound::http::ApiResult;
use crate::inbound::http::idempotency::{extract_idempotency_key, map_idempotency_key_error};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, missing_field_error};

/// Header carrying the provider's webhook signature.
pub const PAYMENT_SIGNATURE_HEADER: &str = "Stripe-Signature";

const REFERENCE: FieldName = FieldName::new("ref");

/// Query string of `GET /api/v1/checkout/confirm`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmParams {
    /// Payment reference returned by `POST /checkout/session`.
    #[serde(rename = "ref")]
    #[param(rename = "ref")]
    pub reference: Option<String>,
}

/// How a confirmation resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    Fulfilled,
    AlreadyProcessed,
    Ignored,
}

/// Response of `GET /api/v1/checkout/confirm`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub order_id: Option<OrderId>,
    pub outcome: ConfirmationState,
}

impl From<ConfirmationOutcome> for ConfirmationResponse {
    fn from(value: ConfirmationOutcome) -> Self {
        let outcome = match value {
            ConfirmationOutcome::Fulfilled(_) => ConfirmationState::Fulfilled,
            ConfirmationOutcome::AlreadyProcessed(_) => ConfirmationState::AlreadyProcessed,
            ConfirmationOutcome::Ignored => ConfirmationState::Ignored,
        };
        Self {
            ok: true,
            order_id: value.order_id().cloned(),
            outcome,
        }
    }
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// Freeze the caller's cart and start paying for it.
///
/// Without a payment provider the order is created immediately and
/// `orderId` is set; otherwise `redirectUrl` points at the hosted checkout.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/session",
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "UUID for idempotent requests")
    ),
    responses(
        (status = 200, description = "Checkout started", body = CheckoutStart),
        (status = 400, description = "Cart is empty", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Idempotency key reused", body = Error),
        (status = 503, description = "Payment provider unavailable", body = Error)
    ),
    tags = ["checkout"],
    operation_id = "createCheckoutSession"
)]
#[post("/checkout/session")]
pub async fn create_checkout_session(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
) -> ApiResult<web::Json<CheckoutStart>> {
    let auth = session.require_auth()?;
    let idempotency_key =
        extract_idempotency_key(request.headers()).map_err(map_idempotency_key_error)?;
    let start = state
        .checkout
        .start_checkout(StartCheckoutRequest {
            auth,
            idempotency_key,
        })
        .await?;
    Ok(web::Json(start))
}

/// Receive payment provider events. The raw body is needed for signature
/// verification, so it is never parsed as JSON first.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payment",
    request_body(content = String, content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "Provider signature")
    ),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature", body = Error)
    ),
    tags = ["checkout"],
    operation_id = "paymentWebhook",
    security([])
)]
#[post("/webhooks/payment")]
pub async fn payment_webhook(
    state: web::Data<HttpState>,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<web::Json<WebhookAck>> {
    let signature = request
        .headers()
        .get(PAYMENT_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    state.checkout.handle_webhook(&body, signature).await?;
    Ok(web::Json(WebhookAck { received: true }))
}

/// Confirm a payment after the shopper returns from the hosted checkout.
///
/// Replays return the same order; the webhook and this call may race.
#[utoipa::path(
    get,
    path = "/api/v1/checkout/confirm",
    params(ConfirmParams),
    responses(
        (status = 200, description = "Payment confirmed", body = ConfirmationResponse),
        (status = 400, description = "Payment not completed", body = Error),
        (status = 503, description = "Payment provider unavailable", body = Error)
    ),
    tags = ["checkout"],
    operation_id = "confirmCheckout",
    security([])
)]
#[get("/checkout/confirm")]
pub async fn confirm_checkout(
    state: web::Data<HttpState>,
    params: web::Query<ConfirmParams>,
) -> ApiResult<web::Json<ConfirmationResponse>> {
    let raw = params
        .reference
        .as_deref()
        .ok_or_else(|| missing_field_error(REFERENCE))?;
    let reference = PaymentReference::new(raw)
        .map_err(|err| invalid_value_error(REFERENCE, raw, err.to_string()))?;
    let outcome = state.checkout.confirm_payment(&reference).await?;
    Ok(web::Json(outcome.into()))
}
