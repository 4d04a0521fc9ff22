//! Port for persisted checkout snapshots.

use async_trait::async_trait;

use crate::domain::{CheckoutSession, OrderId, PaymentReference};

use super::define_port_error;

define_port_error! {
    /// Errors raised by checkout session adapters.
    pub enum CheckoutSessionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "checkout session repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "checkout session repository query failed: {message}",
        /// The stored snapshot could not be decoded.
        Serialization { message: String } => "checkout session snapshot is malformed: {message}",
    }
}

/// Storage of checkout sessions keyed by payment reference.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckoutSessionRepository: Send + Sync {
    /// Persist a freshly opened session.
    async fn save(&self, session: &CheckoutSession) -> Result<(), CheckoutSessionRepositoryError>;

    /// Session for a reference.
    async fn find(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<CheckoutSession>, CheckoutSessionRepositoryError>;

    /// Record the order created for a session.
    async fn mark_completed(
        &self,
        reference: &PaymentReference,
        order_id: &OrderId,
    ) -> Result<(), CheckoutSessionRepositoryError>;
}
