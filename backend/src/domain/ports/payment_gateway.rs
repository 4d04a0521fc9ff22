//! Port for the external hosted-checkout payment provider.

use async_trait::async_trait;

use crate::domain::{
    PaymentEvent, PaymentReference, PaymentSession, PaymentSessionRequest, PaymentStatusReport,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment gateway adapters.
    pub enum PaymentGatewayError {
        /// The provider could not be reached or timed out.
        Unavailable { message: String } => "payment provider unavailable: {message}",
        /// The provider refused the request.
        Rejected { message: String } => "payment provider rejected the request: {message}",
        /// The provider answered with something unusable.
        InvalidResponse { message: String } => "payment provider returned an invalid response: {message}",
        /// A webhook failed signature verification.
        InvalidSignature { message: String } => "webhook signature rejected: {message}",
    }
}

/// Hosted payment sessions and their signed notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted session for the request.
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSession, PaymentGatewayError>;

    /// Current status and metadata of a session.
    async fn retrieve_session(
        &self,
        reference: &PaymentReference,
    ) -> Result<PaymentStatusReport, PaymentGatewayError>;

    /// Verify a webhook body against its signature header and decode it.
    fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, PaymentGatewayError>;
}
