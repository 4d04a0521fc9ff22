//! Signed payment webhooks driving checkout confirmation end to end.

use std::sync::Arc;

use async_trait::async_trait;
use fluxcart::domain::ports::{PaymentGateway, PaymentGatewayError, StartCheckoutRequest};
use fluxcart::domain::{
    AuthContext, ConfirmationOutcome, ErrorCode, PaymentEvent, PaymentReference, PaymentSession,
    PaymentSessionRequest, PaymentStatusReport,
};
use fluxcart::outbound::payment::{
    SIGNATURE_TOLERANCE_SECONDS, StripeConfig, StripeGateway, sign_webhook_payload,
};
use fluxcart::test_support::catalog::product;
use fluxcart::test_support::clock::MutableClock;
use fluxcart::test_support::payment::FakePaymentGateway;
use fluxcart::test_support::shop::TestShop;
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::json;
use zeroize::Zeroizing;

#[path = "support/shop.rs"]
mod shop_support;

use shop_support::{add_to_cart, sign_in};

const WEBHOOK_SECRET: &str = "whsec_integration";

/// Opens sessions in-process but checks webhooks like the real adapter.
struct SignedWebhookGateway {
    sessions: FakePaymentGateway,
    verifier: StripeGateway,
}

#[async_trait]
impl PaymentGateway for SignedWebhookGateway {
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentGatewayError> {
        self.sessions.create_session(request).await
    }

    async fn retrieve_session(
        &self,
        reference: &PaymentReference,
    ) -> Result<PaymentStatusReport, PaymentGatewayError> {
        self.sessions.retrieve_session(reference).await
    }

    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, PaymentGatewayError> {
        self.verifier.verify_event(payload, signature)
    }
}

struct Checkout {
    shop: TestShop,
    auth: AuthContext,
    reference: PaymentReference,
}

impl Checkout {
    fn paid_event(&self) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": self.reference.as_ref(),
                "payment_status": "paid",
                "metadata": {"userId": self.auth.user_id().to_string()},
            }}
        }))
        .expect("event serialises")
    }

    fn signature_at(&self, timestamp: i64, body: &[u8]) -> String {
        let digest = sign_webhook_payload(WEBHOOK_SECRET.as_bytes(), timestamp, body);
        format!("t={timestamp},v1={digest}")
    }

    fn now(&self) -> i64 {
        self.shop.clock.utc().timestamp()
    }

    async fn deliver(
        &self,
        body: &[u8],
        signature: Option<String>,
    ) -> Result<ConfirmationOutcome, fluxcart::domain::Error> {
        self.shop
            .state
            .checkout
            .handle_webhook(body, signature)
            .await
    }
}

#[fixture]
async fn checkout() -> Checkout {
    let lamp = product("brass-lamp", 60_000);
    let mut config = StripeConfig::new(Zeroizing::new("sk_test_integration".to_owned()))
        .expect("default api base");
    config.webhook_secret = Some(Zeroizing::new(WEBHOOK_SECRET.to_owned()));
    let verifier =
        StripeGateway::new(config, Arc::new(MutableClock::default())).expect("client builds");
    let gateway = Arc::new(SignedWebhookGateway {
        sessions: FakePaymentGateway::default(),
        verifier,
    });
    let shop = TestShop::with_gateway(vec![lamp.clone()], gateway);
    let auth = sign_in(&shop, "ada@example.com").await;
    add_to_cart(&shop, &auth, &lamp, 2).await;
    let start = shop
        .state
        .checkout
        .start_checkout(StartCheckoutRequest {
            auth: auth.clone(),
            idempotency_key: None,
        })
        .await
        .expect("checkout starts");
    Checkout {
        shop,
        auth,
        reference: start.reference,
    }
}

#[rstest]
#[tokio::test]
async fn signed_paid_event_fulfils_once(#[future] checkout: Checkout) {
    let checkout = checkout.await;
    let body = checkout.paid_event();
    let signature = checkout.signature_at(checkout.now(), &body);

    let first = checkout
        .deliver(&body, Some(signature.clone()))
        .await
        .expect("first delivery");
    let replay = checkout
        .deliver(&body, Some(signature))
        .await
        .expect("replayed delivery");

    let ConfirmationOutcome::Fulfilled(order_id) = first else {
        panic!("expected a new order, got {first:?}");
    };
    assert_eq!(replay, ConfirmationOutcome::AlreadyProcessed(order_id.clone()));
    let orders = checkout
        .shop
        .state
        .orders_query
        .list_orders(&checkout.auth)
        .await
        .expect("orders listed");
    assert_eq!(orders.len(), 1);
    let order = orders.first().expect("order");
    assert_eq!(order.id, order_id);
    assert_eq!(order.total_cents, 108_000);
    assert_eq!(order.discount_cents, 12_000);
}

#[rstest]
#[tokio::test]
async fn tampered_body_is_rejected(#[future] checkout: Checkout) {
    let checkout = checkout.await;
    let body = checkout.paid_event();
    let signature = checkout.signature_at(checkout.now(), &body);
    let mut tampered = body.clone();
    tampered.extend_from_slice(b" ");

    let error = checkout
        .deliver(&tampered, Some(signature))
        .await
        .expect_err("tampered body");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.message(), "invalid webhook signature");
}

#[rstest]
#[tokio::test]
async fn stale_signature_is_rejected(#[future] checkout: Checkout) {
    let checkout = checkout.await;
    let body = checkout.paid_event();
    let stale = checkout.now() - SIGNATURE_TOLERANCE_SECONDS - 1;
    let signature = checkout.signature_at(stale, &body);

    let error = checkout
        .deliver(&body, Some(signature))
        .await
        .expect_err("stale signature");

    assert_eq!(error.message(), "invalid webhook signature");
}

#[rstest]
#[case(None)]
#[case(Some("   ".to_owned()))]
#[tokio::test]
async fn missing_signature_is_rejected(
    #[future] checkout: Checkout,
    #[case] signature: Option<String>,
) {
    let checkout = checkout.await;
    let body = checkout.paid_event();

    let error = checkout
        .deliver(&body, signature)
        .await
        .expect_err("unsigned delivery");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.message(), "missing webhook signature");
}
