//! Test clock — a frozen `Clock` for deterministic player echoes.

use chrono::{DateTime, TimeZone, Utc};
use parlance_core::clock::Clock;

/// A clock frozen at a fixed point in time.
///
/// `FixedClock::default()` is frozen at 2026-01-15 10:00:00 UTC, the instant
/// shared by the conversation tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Frozen at `millis` milliseconds since the Unix epoch. Out-of-range
    /// values fall back to the epoch.
    #[must_use]
    pub fn at_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
                .single()
                .unwrap_or_default(),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
