//! Driving port for checkout and payment confirmation.

use async_trait::async_trait;

use crate::domain::{
    AuthContext, CheckoutStart, ConfirmationOutcome, Error, IdempotencyKey, PaymentReference,
};

/// Request to open a checkout for the caller's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCheckoutRequest {
    /// Caller.
    pub auth: AuthContext,
    /// Optional retry key.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Domain use-case port for the checkout state machine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckoutCommand: Send + Sync {
    /// Freeze the cart and either complete a simulated checkout or open a
    /// hosted payment session.
    async fn start_checkout(&self, request: StartCheckoutRequest) -> Result<CheckoutStart, Error>;

    /// Finalise a paid session. Safe to call any number of times.
    async fn confirm_payment(
        &self,
        reference: &PaymentReference,
    ) -> Result<ConfirmationOutcome, Error>;

    /// Verify a provider webhook and finalise the sessions it reports.
    async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<String>,
    ) -> Result<ConfirmationOutcome, Error>;
}
