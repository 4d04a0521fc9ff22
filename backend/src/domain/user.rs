//! Users and the identifiers that resolve to them.
//!
//! Shoppers sign in with whatever identifier they have to hand: an email
//! address, a phone number, or (in development) an arbitrary token. The
//! identifier is classified once at the boundary and resolved to a durable
//! [`User`] through the [`UserDirectory`](super::ports::UserDirectory) port.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use super::UserId;

/// Maximum number of characters kept from a development alias.
pub const DEV_ALIAS_MAX_CHARS: usize = 12;
/// Mail domain used for development aliases.
pub const DEV_ALIAS_DOMAIN: &str = "dev.local";
/// Display name given to users created from a development alias.
pub const DEV_USER_NAME: &str = "Dev User";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

fn phone_regex() -> &'static Regex {
    PHONE_RE.get_or_init(|| {
        Regex::new(r"^\+?\d{7,15}$")
            .unwrap_or_else(|error| panic!("phone regex failed to compile: {error}"))
    })
}

/// Whether `raw` is a phone number: optional `+`, then 7 to 15 digits.
pub(crate) fn is_phone_number(raw: &str) -> bool {
    phone_regex().is_match(raw)
}

/// Validation errors for [`UserIdentifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdentifierError {
    /// The identifier was blank once trimmed.
    #[error("identifier must not be empty")]
    Empty,
}

/// Classified sign-in identifier.
///
/// # Examples
/// ```
/// use fluxcart::domain::UserIdentifier;
///
/// let id = UserIdentifier::parse(" ada@example.com ").unwrap();
/// assert_eq!(id, UserIdentifier::Email("ada@example.com".into()));
/// assert_eq!(UserIdentifier::parse("+919876543210").unwrap().as_str(), "+919876543210");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentifier {
    /// Matches the email pattern.
    Email(String),
    /// Matches the phone pattern (optional `+`, 7 to 15 digits).
    Phone(String),
    /// Any other token; maps to a development alias address.
    Alias(String),
}

impl UserIdentifier {
    /// Trim and classify a raw identifier.
    ///
    /// # Errors
    /// Returns [`UserIdentifierError::Empty`] for blank input.
    pub fn parse(raw: &str) -> Result<Self, UserIdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UserIdentifierError::Empty);
        }
        let value = trimmed.to_owned();
        if email_regex().is_match(trimmed) {
            Ok(Self::Email(value))
        } else if is_phone_number(trimmed) {
            Ok(Self::Phone(value))
        } else {
            Ok(Self::Alias(value))
        }
    }

    /// The identifier as supplied (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(value) | Self::Phone(value) | Self::Alias(value) => value.as_str(),
        }
    }

    /// Profile used when the identifier resolves to a user for the first time.
    #[must_use]
    pub fn new_profile(&self) -> NewUserProfile {
        match self {
            Self::Email(email) => NewUserProfile {
                email: Some(email.clone()),
                phone: None,
                display_name: email
                    .split('@')
                    .next()
                    .filter(|local| !local.is_empty())
                    .unwrap_or(email.as_str())
                    .to_owned(),
            },
            Self::Phone(phone) => NewUserProfile {
                email: None,
                phone: Some(phone.clone()),
                display_name: mask_phone(phone),
            },
            Self::Alias(alias) => NewUserProfile {
                email: Some(dev_alias_email(alias)),
                phone: None,
                display_name: DEV_USER_NAME.to_owned(),
            },
        }
    }
}

/// Attributes of a user created during identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserProfile {
    /// Unique email address, when known.
    pub email: Option<String>,
    /// Unique phone number, when known.
    pub phone: Option<String>,
    /// Name shown in receipts and the storefront.
    pub display_name: String,
}

fn dev_alias_email(alias: &str) -> String {
    let prefix: String = alias.chars().take(DEV_ALIAS_MAX_CHARS).collect();
    format!("{prefix}@{DEV_ALIAS_DOMAIN}")
}

fn mask_phone(phone: &str) -> String {
    let country: String = phone
        .trim_start_matches('+')
        .chars()
        .take(2)
        .collect();
    format!("+{country}•••")
}

/// Application user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    id: UserId,
    #[schema(example = "ada")]
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
}

impl User {
    /// Assemble a user from stored parts.
    #[must_use]
    pub const fn new(
        id: UserId,
        display_name: String,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        Self {
            id,
            display_name,
            email,
            phone,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Email address used for receipts.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Phone number.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}
