//! Webhook signature verification.
//!
//! The provider signs `"<timestamp>.<raw body>"` with HMAC-SHA256 and sends
//! `t=<timestamp>,v1=<hex digest>[,v1=...]`. A signature is accepted when any
//! `v1` entry matches and the timestamp lies within the tolerance window.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew between the provider and this server.
pub const SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

/// Reasons a webhook signature is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The header lacked a timestamp or any `v1` entry.
    #[error("signature header is malformed")]
    Malformed,
    /// The timestamp is outside the tolerance window.
    #[error("signature timestamp is outside the tolerance window")]
    Stale,
    /// No `v1` digest matched the payload.
    #[error("no signature matches the payload")]
    Mismatch,
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSignature {
    timestamp: i64,
    digests: Vec<Vec<u8>>,
}

impl WebhookSignature {
    /// Parse a signature header.
    ///
    /// Unknown schemes and undecodable digests are ignored.
    ///
    /// # Errors
    /// Returns [`SignatureError::Malformed`] without a timestamp or a `v1`
    /// digest.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut digests = Vec::new();
        for part in header.split(',') {
            let Some((scheme, value)) = part.trim().split_once('=') else {
                continue;
            };
            match scheme {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => {
                    if let Ok(digest) = hex::decode(value) {
                        digests.push(digest);
                    }
                }
                _ => {}
            }
        }
        match timestamp {
            Some(ts) if !digests.is_empty() => Ok(Self {
                timestamp: ts,
                digests,
            }),
            _ => Err(SignatureError::Malformed),
        }
    }

    /// Check the signature against `payload` at time `now`.
    ///
    /// # Errors
    /// Returns [`SignatureError::Stale`] outside the tolerance window and
    /// [`SignatureError::Mismatch`] when no digest matches.
    pub fn verify(
        &self,
        secret: &[u8],
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        if now.timestamp().abs_diff(self.timestamp) > SIGNATURE_TOLERANCE_SECONDS.unsigned_abs() {
            return Err(SignatureError::Stale);
        }
        let matches = self.digests.iter().any(|digest| {
            signing_mac(secret, self.timestamp, payload)
                .is_some_and(|mac| mac.verify_slice(digest).is_ok())
        });
        if matches {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

fn signing_mac(secret: &[u8], timestamp: i64, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Compute the `v1` digest for a payload; used to sign test fixtures.
#[cfg(any(test, feature = "test-support"))]
#[must_use]
pub fn sign(secret: &[u8], timestamp: i64, payload: &[u8]) -> String {
    signing_mac(secret, timestamp, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}
