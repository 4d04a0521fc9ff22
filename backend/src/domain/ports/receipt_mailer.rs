//! Port for delivering rendered receipts.

use async_trait::async_trait;

use crate::domain::ReceiptMessage;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mail adapters.
    pub enum ReceiptMailerError {
        /// The relay could not be reached.
        Unavailable { message: String } => "mail relay unavailable: {message}",
        /// The relay refused the message.
        Rejected { message: String } => "mail relay rejected the message: {message}",
    }
}

/// Outbound mail delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptMailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: &ReceiptMessage) -> Result<(), ReceiptMailerError>;
}

/// Mailer used when no relay is configured; drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledReceiptMailer;

#[async_trait]
impl ReceiptMailer for DisabledReceiptMailer {
    async fn send(&self, message: &ReceiptMessage) -> Result<(), ReceiptMailerError> {
        tracing::debug!(subject = %message.content.subject, "mail relay not configured; receipt skipped");
        Ok(())
    }
}
