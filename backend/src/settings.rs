//! Application settings loaded via OrthoConfig.
//!
//! Every field can be set on the command line, in a config file, or through
//! a `FLUXCART_`-prefixed environment variable such as
//! `FLUXCART_DATABASE_URL`. Optional collaborators (payment provider, search,
//! mail relay, database) are disabled when their settings are absent.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::{GroupBuySettlementConfig, IdempotencyConfig};
use crate::inbound::http::session_config::SessionToggles;
use crate::outbound::mail::MailRelayConfig;
use crate::outbound::notifications::DEFAULT_RECEIPT_QUEUE_CAPACITY;
use crate::outbound::payment::StripeConfig;
use crate::outbound::search::MeilisearchConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_WEB_URL: &str = "http://localhost:3000";
const DEFAULT_MAIL_FROM: &str = "FluxCart <no-reply@example.com>";

/// Errors raised while turning raw settings into typed configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A setting did not parse.
    #[error("invalid value for {name}='{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl SettingsError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Server, collaborator and worker settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FLUXCART")]
pub struct AppSettings {
    /// Listen address, `host:port`.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; the in-memory store is used without one.
    pub database_url: Option<String>,
    /// Storefront origin used in redirects and receipt links.
    pub web_url: Option<String>,
    /// Session key file.
    pub session_key_file: Option<PathBuf>,
    /// Secure cookie toggle.
    pub session_cookie_secure: Option<String>,
    /// SameSite policy.
    pub session_samesite: Option<String>,
    /// Allow a generated key when the key file is unreadable.
    pub session_allow_ephemeral: Option<String>,
    /// Payment provider secret key; simulated checkout without one.
    pub stripe_secret_key: Option<String>,
    /// Webhook signing secret.
    pub stripe_webhook_secret: Option<String>,
    /// Payment provider API base URL override.
    pub stripe_api_base: Option<String>,
    /// Search engine URL.
    pub meili_url: Option<String>,
    /// Search engine API key.
    pub meili_api_key: Option<String>,
    /// Mail relay endpoint; receipts are skipped without one.
    pub mail_relay_url: Option<String>,
    /// Mail relay bearer token.
    pub mail_relay_token: Option<String>,
    /// Receipt sender.
    pub mail_from: Option<String>,
    /// Blind copy on every receipt.
    pub mail_bcc: Option<String>,
    /// Receipt queue depth.
    pub receipt_queue_capacity: Option<usize>,
    /// Run the group-buy settlement worker; on unless set to false.
    pub settlement_enabled: Option<bool>,
    /// Seconds between settlement passes.
    pub settlement_interval_secs: Option<u64>,
    /// Group-buys considered per pass.
    pub settlement_batch_size: Option<u32>,
    /// Seconds before an abandoned SETTLING claim may be retaken.
    pub settlement_lease_secs: Option<u64>,
    /// Hours idempotency records are kept.
    pub idempotency_ttl_hours: Option<u64>,
}

impl AppSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] for a malformed address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .map_err(|err| SettingsError::invalid("FLUXCART_BIND_ADDR", raw, err))
    }

    /// Whether this instance runs the settlement worker.
    #[must_use]
    pub fn settlement_enabled(&self) -> bool {
        self.settlement_enabled.unwrap_or(true)
    }

    /// Storefront origin without a trailing slash.
    pub fn web_url(&self) -> &str {
        self.web_url
            .as_deref()
            .unwrap_or(DEFAULT_WEB_URL)
            .trim_end_matches('/')
    }

    /// Raw session toggles for validation.
    pub fn session_toggles(&self) -> SessionToggles {
        SessionToggles {
            key_file: self.session_key_file.clone(),
            cookie_secure: self.session_cookie_secure.clone(),
            same_site: self.session_samesite.clone(),
            allow_ephemeral: self.session_allow_ephemeral.clone(),
        }
    }

    /// Payment provider configuration, if a secret key is set.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] for a malformed API base.
    pub fn stripe_config(&self) -> Result<Option<StripeConfig>, SettingsError> {
        let Some(secret) = non_blank(self.stripe_secret_key.as_deref()) else {
            return Ok(None);
        };
        let mut config = StripeConfig::new(Zeroizing::new(secret.to_owned()))
            .map_err(|err| SettingsError::invalid("FLUXCART_STRIPE_API_BASE", "", err))?;
        config.webhook_secret = non_blank(self.stripe_webhook_secret.as_deref())
            .map(|value| Zeroizing::new(value.to_owned()));
        if let Some(base) = non_blank(self.stripe_api_base.as_deref()) {
            config.api_base = parse_url("FLUXCART_STRIPE_API_BASE", base)?;
        }
        Ok(Some(config))
    }

    /// Search engine configuration, if a URL is set.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] for a malformed URL.
    pub fn search_config(&self) -> Result<Option<MeilisearchConfig>, SettingsError> {
        let Some(raw) = non_blank(self.meili_url.as_deref()) else {
            return Ok(None);
        };
        let mut config = MeilisearchConfig::new(parse_url("FLUXCART_MEILI_URL", raw)?);
        config.api_key =
            non_blank(self.meili_api_key.as_deref()).map(|value| Zeroizing::new(value.to_owned()));
        Ok(Some(config))
    }

    /// Mail relay configuration, if an endpoint is set.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] for a malformed URL.
    pub fn mail_relay_config(&self) -> Result<Option<MailRelayConfig>, SettingsError> {
        let Some(raw) = non_blank(self.mail_relay_url.as_deref()) else {
            return Ok(None);
        };
        let from = non_blank(self.mail_from.as_deref()).unwrap_or(DEFAULT_MAIL_FROM);
        let mut config =
            MailRelayConfig::new(parse_url("FLUXCART_MAIL_RELAY_URL", raw)?, from.to_owned());
        config.bcc = non_blank(self.mail_bcc.as_deref()).map(str::to_owned);
        config.token = non_blank(self.mail_relay_token.as_deref())
            .map(|value| Zeroizing::new(value.to_owned()));
        Ok(Some(config))
    }

    /// Receipt queue depth.
    pub fn receipt_queue_capacity(&self) -> usize {
        self.receipt_queue_capacity
            .unwrap_or(DEFAULT_RECEIPT_QUEUE_CAPACITY)
    }

    /// Settlement worker configuration, with defaults for unset fields.
    pub fn settlement_config(&self) -> GroupBuySettlementConfig {
        let defaults = GroupBuySettlementConfig::default();
        GroupBuySettlementConfig {
            interval: self
                .settlement_interval_secs
                .map_or(defaults.interval, |secs| Duration::from_secs(secs.max(1))),
            batch_size: self
                .settlement_batch_size
                .map_or(defaults.batch_size, |size| size.max(1)),
            lease: self
                .settlement_lease_secs
                .map_or(defaults.lease, Duration::from_secs),
        }
    }

    /// Idempotency retention.
    pub fn idempotency_config(&self) -> IdempotencyConfig {
        self.idempotency_ttl_hours
            .map_or_else(IdempotencyConfig::default, IdempotencyConfig::from_hours)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|err| SettingsError::invalid(name, raw, err))
}
