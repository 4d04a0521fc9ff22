//! Unit tests for session configuration validation.

use std::io::Write;

use super::*;
use rstest::{fixture, rstest};
use tempfile::NamedTempFile;
use uuid::Uuid;

fn key_file_of(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp key file");
    file.write_all(&vec![b'a'; len]).expect("key material written");
    file
}

#[fixture]
fn key_file() -> NamedTempFile {
    key_file_of(SESSION_KEY_MIN_LEN)
}

fn release_defaults(key_file: &NamedTempFile) -> SessionToggles {
    SessionToggles {
        key_file: Some(key_file.path().to_path_buf()),
        cookie_secure: Some("1".to_owned()),
        same_site: Some("Strict".to_owned()),
        allow_ephemeral: Some("0".to_owned()),
    }
}

fn expect_error(
    result: Result<SessionSettings, SessionConfigError>,
    label: &str,
) -> SessionConfigError {
    match result {
        Ok(_) => panic!("{label}"),
        Err(error) => error,
    }
}

#[rstest]
fn release_missing_cookie_secure_is_rejected(key_file: NamedTempFile) {
    let toggles = SessionToggles {
        cookie_secure: None,
        ..release_defaults(&key_file)
    };

    let err = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "expected missing cookie secure to fail",
    );
    assert!(matches!(
        err,
        SessionConfigError::MissingSetting {
            name: COOKIE_SECURE_SETTING
        }
    ));
}

#[rstest]
#[case("maybe")]
#[case("")]
fn release_invalid_cookie_secure_is_rejected(key_file: NamedTempFile, #[case] value: &str) {
    let toggles = SessionToggles {
        cookie_secure: Some(value.to_owned()),
        ..release_defaults(&key_file)
    };

    let err = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "expected invalid cookie secure to fail",
    );
    assert!(matches!(
        err,
        SessionConfigError::InvalidSetting {
            name: COOKIE_SECURE_SETTING,
            ..
        }
    ));
}

#[rstest]
fn release_missing_same_site_is_rejected(key_file: NamedTempFile) {
    let toggles = SessionToggles {
        same_site: None,
        ..release_defaults(&key_file)
    };

    let err = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "expected missing SameSite to fail",
    );
    assert!(matches!(
        err,
        SessionConfigError::MissingSetting {
            name: SAMESITE_SETTING
        }
    ));
}

#[rstest]
fn release_missing_allow_ephemeral_is_rejected(key_file: NamedTempFile) {
    let toggles = SessionToggles {
        allow_ephemeral: None,
        ..release_defaults(&key_file)
    };

    let err = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "expected missing allow ephemeral to fail",
    );
    assert!(matches!(
        err,
        SessionConfigError::MissingSetting {
            name: ALLOW_EPHEMERAL_SETTING
        }
    ));
}

#[rstest]
fn release_ephemeral_enabled_is_rejected(key_file: NamedTempFile) {
    let toggles = SessionToggles {
        allow_ephemeral: Some("yes".to_owned()),
        ..release_defaults(&key_file)
    };

    let err = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "expected ephemeral to be rejected in release",
    );
    assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_unreadable_key_file_is_rejected(key_file: NamedTempFile) {
    let missing = std::env::temp_dir().join(format!("fluxcart-missing-{}", Uuid::new_v4()));
    let toggles = SessionToggles {
        key_file: Some(missing),
        ..release_defaults(&key_file)
    };

    let err = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "expected missing key file to fail",
    );
    assert!(matches!(err, SessionConfigError::KeyRead { .. }));
}

#[rstest]
fn release_short_key_is_rejected() {
    let short = key_file_of(32);

    let err = expect_error(
        session_settings(&release_defaults(&short), BuildMode::Release),
        "expected short key to fail",
    );
    assert!(matches!(
        err,
        SessionConfigError::KeyTooShort {
            length: 32,
            min_len: SESSION_KEY_MIN_LEN,
            ..
        }
    ));
}

#[rstest]
fn release_insecure_none_same_site_is_rejected(key_file: NamedTempFile) {
    let toggles = SessionToggles {
        cookie_secure: Some("0".to_owned()),
        same_site: Some("None".to_owned()),
        ..release_defaults(&key_file)
    };

    let err = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "expected insecure SameSite=None to fail",
    );
    assert!(matches!(err, SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn release_valid_settings_succeed(key_file: NamedTempFile) {
    let settings = session_settings(&release_defaults(&key_file), BuildMode::Release)
        .expect("expected valid settings");

    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
    assert_eq!(
        settings.key_fingerprint(),
        fingerprint::key_fingerprint(&Key::derive_from(&[b'a'; SESSION_KEY_MIN_LEN]))
    );
}

#[rstest]
fn debug_defaults_allow_an_ephemeral_key() {
    let toggles = SessionToggles {
        key_file: Some(std::env::temp_dir().join(format!("fluxcart-missing-{}", Uuid::new_v4()))),
        ..SessionToggles::default()
    };

    let settings =
        session_settings(&toggles, BuildMode::Debug).expect("debug defaults should succeed");

    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
}

#[rstest]
#[case("unexpected", SameSite::Lax)]
#[case(" none ", SameSite::None)]
fn debug_same_site_values_are_lenient(
    key_file: NamedTempFile,
    #[case] value: &str,
    #[case] expected: SameSite,
) {
    let toggles = SessionToggles {
        same_site: Some(value.to_owned()),
        cookie_secure: Some("0".to_owned()),
        ..release_defaults(&key_file)
    };

    let settings =
        session_settings(&toggles, BuildMode::Debug).expect("debug should fall back to defaults");

    assert_eq!(settings.same_site, expected);
}
