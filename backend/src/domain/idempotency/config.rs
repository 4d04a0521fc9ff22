//! Retention of idempotency records.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Accepted retention, in hours: one hour up to thirty days.
const TTL_HOURS: RangeInclusive<u64> = 1..=24 * 30;

/// How long a stored response is replayed before the purge task may drop it.
///
/// # Examples
/// ```
/// # use fluxcart::domain::idempotency::IdempotencyConfig;
/// # use std::time::Duration;
/// assert_eq!(IdempotencyConfig::default().ttl(), Duration::from_secs(24 * 3600));
/// assert_eq!(IdempotencyConfig::from_hours(0).ttl(), Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyConfig {
    ttl_hours: u64,
}

impl IdempotencyConfig {
    /// Retention of `hours`, clamped into the accepted range.
    #[must_use]
    pub fn from_hours(hours: u64) -> Self {
        Self {
            ttl_hours: hours.clamp(*TTL_HOURS.start(), *TTL_HOURS.end()),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self::from_hours(24)
    }
}
