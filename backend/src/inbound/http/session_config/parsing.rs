//! Parsing of individual session toggles.

use actix_web::cookie::SameSite;
use tracing::warn;

use super::{BuildMode, SAMESITE_SETTING, SessionConfigError};

const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";
const SAMESITE_EXPECTED: &str = "Strict|Lax|None";

/// Debug builds log `error` and continue with `fallback`; release builds fail.
pub(super) fn tolerate<T>(
    mode: BuildMode,
    fallback: T,
    error: SessionConfigError,
) -> Result<T, SessionConfigError> {
    if mode.is_debug() {
        warn!(%error, "session toggle rejected; continuing with the debug default");
        Ok(fallback)
    } else {
        Err(error)
    }
}

/// Parse the boolean toggle `name`, using `fallback` in debug builds when it
/// is missing or malformed.
pub(super) fn flag(
    name: &'static str,
    value: Option<&str>,
    mode: BuildMode,
    fallback: bool,
) -> Result<bool, SessionConfigError> {
    let Some(raw) = value else {
        return tolerate(mode, fallback, SessionConfigError::MissingSetting { name });
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => tolerate(
            mode,
            fallback,
            SessionConfigError::InvalidSetting {
                name,
                value: raw.to_owned(),
                expected: BOOL_EXPECTED,
            },
        ),
    }
}

/// Parse the `SameSite` policy. `None` needs a secure cookie outside debug
/// builds; anything unrecognised falls back to `Lax` in debug builds.
pub(super) fn same_site(
    value: Option<&str>,
    mode: BuildMode,
    cookie_secure: bool,
) -> Result<SameSite, SessionConfigError> {
    let Some(raw) = value else {
        return tolerate(
            mode,
            SameSite::Lax,
            SessionConfigError::MissingSetting {
                name: SAMESITE_SETTING,
            },
        );
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" if cookie_secure => Ok(SameSite::None),
        "none" => tolerate(mode, SameSite::None, SessionConfigError::InsecureSameSiteNone),
        _ => tolerate(
            mode,
            SameSite::Lax,
            SessionConfigError::InvalidSetting {
                name: SAMESITE_SETTING,
                value: raw.to_owned(),
                expected: SAMESITE_EXPECTED,
            },
        ),
    }
}
