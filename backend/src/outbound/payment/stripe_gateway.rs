//! Reqwest-backed Stripe-compatible payment gateway.
//!
//! This adapter owns transport details only: form encoding, basic
//! authentication, timeout and HTTP error mapping, JSON decoding and webhook
//! signature checks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{CreatedSessionDto, EventDto, SessionDto, session_form};
use super::signature::{SignatureError, WebhookSignature};
use crate::domain::ports::{PaymentGateway, PaymentGatewayError};
use crate::domain::{
    PaymentEvent, PaymentReference, PaymentSession, PaymentSessionRequest, PaymentStatusReport,
};

/// Default provider endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials and endpoint of the payment provider.
pub struct StripeConfig {
    /// Secret API key, sent as the basic-auth user name.
    pub secret_key: Zeroizing<String>,
    /// Webhook signing secret; webhooks are rejected without one.
    pub webhook_secret: Option<Zeroizing<String>>,
    /// API base URL.
    pub api_base: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl StripeConfig {
    /// Configuration against the public API with the default timeout.
    ///
    /// # Errors
    /// Returns an error if the built-in base URL fails to parse.
    pub fn new(secret_key: Zeroizing<String>) -> Result<Self, url::ParseError> {
        Ok(Self {
            secret_key,
            webhook_secret: None,
            api_base: Url::parse(DEFAULT_API_BASE)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

/// Payment gateway adapter over HTTP.
pub struct StripeGateway {
    client: Client,
    secret_key: Zeroizing<String>,
    webhook_secret: Option<Zeroizing<String>>,
    api_base: Url,
    clock: Arc<dyn Clock>,
}

impl StripeGateway {
    /// Build an adapter using a reqwest client with the configured timeout.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: StripeConfig, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            secret_key: config.secret_key,
            webhook_secret: config.webhook_secret,
            api_base: config.api_base,
            clock,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, PaymentGatewayError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| PaymentGatewayError::unavailable("payment API base cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentGatewayError> {
        let url = self.endpoint(&["v1", "checkout", "sessions"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(self.secret_key.as_str(), None::<&str>)
            .form(&session_form(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let created: CreatedSessionDto = decode(body.as_ref())?;
        let redirect_url = created.url.ok_or_else(|| {
            PaymentGatewayError::invalid_response("session response lacks a redirect url")
        })?;
        let reference = PaymentReference::new(created.id)
            .map_err(|err| PaymentGatewayError::invalid_response(err.to_string()))?;
        debug!(reference = %reference, "payment session opened");
        Ok(PaymentSession {
            reference,
            redirect_url,
        })
    }

    async fn retrieve_session(
        &self,
        reference: &PaymentReference,
    ) -> Result<PaymentStatusReport, PaymentGatewayError> {
        let url = self.endpoint(&["v1", "checkout", "sessions", reference.as_ref()])?;
        let response = self
            .client
            .get(url)
            .basic_auth(self.secret_key.as_str(), None::<&str>)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let session: SessionDto = decode(body.as_ref())?;
        session
            .into_report()
            .map_err(PaymentGatewayError::invalid_response)
    }

    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, PaymentGatewayError> {
        let secret = self.webhook_secret.as_ref().ok_or_else(|| {
            PaymentGatewayError::invalid_signature("webhook secret is not configured")
        })?;
        WebhookSignature::parse(signature)
            .and_then(|parsed| parsed.verify(secret.as_bytes(), payload, self.clock.utc()))
            .map_err(map_signature_error)?;
        let event: EventDto = serde_json::from_slice(payload).map_err(|err| {
            PaymentGatewayError::invalid_response(format!("invalid event payload: {err}"))
        })?;
        event
            .into_event()
            .map_err(PaymentGatewayError::invalid_response)
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, PaymentGatewayError> {
    serde_json::from_slice(body).map_err(|err| {
        PaymentGatewayError::invalid_response(format!("invalid payment JSON payload: {err}"))
    })
}

fn map_signature_error(error: SignatureError) -> PaymentGatewayError {
    PaymentGatewayError::invalid_signature(error.to_string())
}

fn map_transport_error(error: reqwest::Error) -> PaymentGatewayError {
    PaymentGatewayError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    let message = format!("status {}: {}", status.as_u16(), provider_message(body));
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        PaymentGatewayError::unavailable(message)
    } else {
        PaymentGatewayError::rejected(message)
    }
}

/// The provider's `error.message`, or a compact preview of the body.
fn provider_message(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            String::from_utf8_lossy(body)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .chars()
                .take(PREVIEW_CHAR_LIMIT)
                .collect()
        })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network gateway helpers.
    use super::*;
    use crate::domain::PaymentEventKind;
    use crate::outbound::payment::signature::sign;
    use crate::test_support::clock::MutableClock;
    use rstest::{fixture, rstest};

    const WEBHOOK_SECRET: &str = "whsec_test";

    #[fixture]
    fn gateway() -> StripeGateway {
        let mut config = StripeConfig::new(Zeroizing::new("sk_test".to_owned())).expect("config");
        config.webhook_secret = Some(Zeroizing::new(WEBHOOK_SECRET.to_owned()));
        config.api_base = Url::parse("http://127.0.0.1:12111/stripe/").expect("url");
        StripeGateway::new(config, Arc::new(MutableClock::default())).expect("gateway")
    }

    #[rstest]
    fn session_endpoints_escape_references(gateway: StripeGateway) {
        let url = gateway
            .endpoint(&["v1", "checkout", "sessions", "cs test/1"])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:12111/stripe/v1/checkout/sessions/cs%20test%2F1"
        );
    }

    #[rstest]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case::server_error(StatusCode::BAD_GATEWAY, true)]
    #[case::bad_request(StatusCode::BAD_REQUEST, false)]
    #[case::unauthorised(StatusCode::UNAUTHORIZED, false)]
    fn maps_statuses(#[case] status: StatusCode, #[case] unavailable: bool) {
        let error = map_status_error(status, br#"{"error":{"message":"No such session"}}"#);
        assert_eq!(
            matches!(error, PaymentGatewayError::Unavailable { .. }),
            unavailable
        );
        assert!(error.to_string().contains("No such session"));
    }

    #[rstest]
    fn signed_events_decode(gateway: StripeGateway) {
        let body = br#"{"type":"checkout.session.async_payment_succeeded","data":{"object":{"id":"cs_1","payment_status":"paid"}}}"#;
        let now = gateway.clock.utc().timestamp();
        let header = format!("t={now},v1={}", sign(WEBHOOK_SECRET.as_bytes(), now, body));

        let event = gateway.verify_event(body, &header).expect("verified");

        assert_eq!(event.kind, PaymentEventKind::AsyncPaymentSucceeded);
        assert!(event.session.is_some_and(|session| session.paid));
    }

    #[rstest]
    fn unsigned_events_are_rejected(gateway: StripeGateway) {
        let error = gateway
            .verify_event(b"{}", "t=1,v1=00")
            .expect_err("rejected");
        assert!(matches!(error, PaymentGatewayError::InvalidSignature { .. }));
    }

    #[rstest]
    fn missing_webhook_secret_rejects_everything() {
        let config = StripeConfig::new(Zeroizing::new("sk_test".to_owned())).expect("config");
        let gateway =
            StripeGateway::new(config, Arc::new(MutableClock::default())).expect("gateway");
        let error = gateway.verify_event(b"{}", "").expect_err("rejected");
        assert!(error.to_string().contains("not configured"));
    }
}
