//! Reqwest-backed HTTP mail relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ReceiptMessage;
use crate::domain::ports::{ReceiptMailer, ReceiptMailerError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Relay endpoint and envelope settings.
pub struct MailRelayConfig {
    /// Relay endpoint receiving `POST` requests.
    pub endpoint: Url,
    /// Sender address.
    pub from: String,
    /// Optional blind copy on every receipt.
    pub bcc: Option<String>,
    /// Optional bearer token.
    pub token: Option<Zeroizing<String>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl MailRelayConfig {
    /// Configuration with no copy, no token and the default timeout.
    #[must_use]
    pub const fn new(endpoint: Url, from: String) -> Self {
        Self {
            endpoint,
            from,
            bcc: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct RelayMessageDto<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bcc: Option<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Receipt mailer posting JSON messages to a relay.
pub struct RelayReceiptMailer {
    client: Client,
    endpoint: Url,
    from: String,
    bcc: Option<String>,
    token: Option<Zeroizing<String>>,
}

impl RelayReceiptMailer {
    /// Build a mailer using a reqwest client with the configured timeout.
    ///
    /// # Errors
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: MailRelayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
            from: config.from,
            bcc: config.bcc,
            token: config.token,
        })
    }

    fn payload<'a>(&'a self, message: &'a ReceiptMessage) -> RelayMessageDto<'a> {
        RelayMessageDto {
            from: &self.from,
            to: &message.to,
            bcc: self.bcc.as_deref(),
            subject: &message.content.subject,
            html: &message.content.html,
            text: &message.content.text,
        }
    }
}

#[async_trait]
impl ReceiptMailer for RelayReceiptMailer {
    async fn send(&self, message: &ReceiptMessage) -> Result<(), ReceiptMailerError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&self.payload(message));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|err| ReceiptMailerError::unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        debug!(subject = %message.content.subject, "receipt handed to mail relay");
        Ok(())
    }
}

fn map_status_error(status: StatusCode) -> ReceiptMailerError {
    let message = format!("status {}", status.as_u16());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ReceiptMailerError::unavailable(message)
    } else {
        ReceiptMailerError::rejected(message)
    }
}
