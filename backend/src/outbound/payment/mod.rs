//! Payment provider adapters.
//!
//! A thin reqwest implementation of the `PaymentGateway` port against a
//! Stripe-compatible hosted checkout API, plus webhook signature checks.

mod dto;
mod signature;
mod stripe_gateway;

pub use signature::{SIGNATURE_TOLERANCE_SECONDS, SignatureError, WebhookSignature};
pub use stripe_gateway::{StripeConfig, StripeGateway};
#[cfg(any(test, feature = "test-support"))]
pub use signature::sign as sign_webhook_payload;
