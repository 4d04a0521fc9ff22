//! Shopper profiles: contact details, shipping address and preferences.
//!
//! A [`Profile`] extends the [`User`] resolved at sign-in with the fields a
//! shopper edits on their account page. Edits arrive as a [`ProfileUpdate`]
//! in which every field is optional; absent fields are left untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use url::Url;
use utoipa::ToSchema;

use super::User;
use super::user::is_phone_number;

const NAME_MAX_CHARS: usize = 120;
const AVATAR_URL_MAX_CHARS: usize = 512;
const BIO_MAX_CHARS: usize = 2000;
const ADDRESS_LINE_MAX_CHARS: usize = 191;
const CITY_MAX_CHARS: usize = 96;
const STATE_MAX_CHARS: usize = 96;
const POSTAL_CODE_MAX_CHARS: usize = 32;
const COUNTRY_MAX_CHARS: usize = 64;
const CURRENCY_MAX_CHARS: usize = 8;

/// Editable account details beyond the sign-in identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    #[schema(example = "https://cdn.example.com/avatars/ada.png")]
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[schema(example = "INR")]
    pub default_currency: Option<String>,
    /// Free-form client settings, stored as given.
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<Value>,
}

/// The caller's account as shown on `/me`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    #[serde(flatten)]
    pub details: ProfileDetails,
    pub created_at: DateTime<Utc>,
}

/// Reasons a profile edit is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileValidationError {
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("avatarUrl must be an absolute http(s) URL")]
    InvalidAvatarUrl,
    #[error("phone must be an optional + followed by 7 to 15 digits")]
    InvalidPhone,
}

impl ProfileValidationError {
    /// Request field the error refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::TooLong { field, .. } => *field,
            Self::InvalidAvatarUrl => "avatarUrl",
            Self::InvalidPhone => "phone",
        }
    }
}

/// Partial edit of a [`Profile`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub default_currency: Option<String>,
    pub preferences: Option<Value>,
}

fn check_len(
    value: Option<String>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ProfileValidationError> {
    match value {
        Some(text) if text.chars().count() > max => {
            Err(ProfileValidationError::TooLong { field, max })
        }
        other => Ok(other),
    }
}

/// Trimmed text, or `None` when nothing is left.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

impl ProfileUpdate {
    /// Validate and normalise an edit.
    ///
    /// The name, phone and avatar URL are trimmed and a blank value means
    /// "unchanged". Other text is kept verbatim, so an empty string clears it.
    ///
    /// # Errors
    /// Returns a [`ProfileValidationError`] for the first field that is too
    /// long or malformed.
    ///
    /// # Examples
    /// ```
    /// use fluxcart::domain::{ProfileUpdate, ProfileValidationError};
    ///
    /// let update = ProfileUpdate {
    ///     display_name: Some("  Ada  ".into()),
    ///     phone: Some("".into()),
    ///     ..ProfileUpdate::default()
    /// }
    /// .normalised()
    /// .unwrap();
    /// assert_eq!(update.display_name.as_deref(), Some("Ada"));
    /// assert_eq!(update.phone, None);
    ///
    /// let bad = ProfileUpdate { phone: Some("12-34".into()), ..ProfileUpdate::default() };
    /// assert_eq!(bad.normalised(), Err(ProfileValidationError::InvalidPhone));
    /// ```
    pub fn normalised(self) -> Result<Self, ProfileValidationError> {
        let display_name = check_len(non_blank(self.display_name), "displayName", NAME_MAX_CHARS)?;
        let avatar_url = check_len(non_blank(self.avatar_url), "avatarUrl", AVATAR_URL_MAX_CHARS)?;
        if let Some(raw) = &avatar_url {
            let parsed = Url::parse(raw).map_err(|_| ProfileValidationError::InvalidAvatarUrl)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ProfileValidationError::InvalidAvatarUrl);
            }
        }
        let phone = non_blank(self.phone);
        if phone.as_deref().is_some_and(|raw| !is_phone_number(raw)) {
            return Err(ProfileValidationError::InvalidPhone);
        }
        Ok(Self {
            display_name,
            avatar_url,
            bio: check_len(self.bio, "bio", BIO_MAX_CHARS)?,
            phone,
            address_line1: check_len(self.address_line1, "addressLine1", ADDRESS_LINE_MAX_CHARS)?,
            address_line2: check_len(self.address_line2, "addressLine2", ADDRESS_LINE_MAX_CHARS)?,
            city: check_len(self.city, "city", CITY_MAX_CHARS)?,
            state: check_len(self.state, "state", STATE_MAX_CHARS)?,
            postal_code: check_len(self.postal_code, "postalCode", POSTAL_CODE_MAX_CHARS)?,
            country: check_len(self.country, "country", COUNTRY_MAX_CHARS)?,
            default_currency: check_len(
                self.default_currency,
                "defaultCurrency",
                CURRENCY_MAX_CHARS,
            )?,
            preferences: self.preferences,
        })
    }

    /// Whether the edit changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields this edit sets.
    pub fn apply(&self, profile: &mut Profile) {
        let user = &profile.user;
        profile.user = User::new(
            user.id().clone(),
            self.display_name
                .clone()
                .unwrap_or_else(|| user.display_name().to_owned()),
            user.email().map(str::to_owned),
            self.phone.clone().or_else(|| user.phone().map(str::to_owned)),
        );
        let details = &mut profile.details;
        let fields = [
            (&mut details.avatar_url, &self.avatar_url),
            (&mut details.bio, &self.bio),
            (&mut details.address_line1, &self.address_line1),
            (&mut details.address_line2, &self.address_line2),
            (&mut details.city, &self.city),
            (&mut details.state, &self.state),
            (&mut details.postal_code, &self.postal_code),
            (&mut details.country, &self.country),
            (&mut details.default_currency, &self.default_currency),
        ];
        for (target, value) in fields {
            if value.is_some() {
                target.clone_from(value);
            }
        }
        if self.preferences.is_some() {
            details.preferences.clone_from(&self.preferences);
        }
    }
}
