//! Wall-clock source used when telemetry arrives without a timestamp.

use chrono::{DateTime, Utc};

/// Source of "now" for timestamp fallbacks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn from_unix_nanos(nanos: i64) -> Self {
        Self(DateTime::from_timestamp_nanos(nanos))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Convert an OTLP nanosecond epoch to an instant, falling back to the clock
/// when the epoch is zero or missing.
pub fn instant_or_now(unix_nanos: Option<i64>, clock: &dyn Clock) -> DateTime<Utc> {
    match unix_nanos {
        Some(nanos) if nanos > 0 => DateTime::from_timestamp_nanos(nanos),
        _ => clock.now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanos_convert_to_instant() {
        let clock = FixedClock::from_unix_nanos(1);
        let ts = instant_or_now(Some(1_700_000_000_123_456_789), &clock);
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_missing_or_zero_uses_clock() {
        let clock = FixedClock::from_unix_nanos(1_600_000_000_000_000_000);
        assert_eq!(instant_or_now(None, &clock), clock.0);
        assert_eq!(instant_or_now(Some(0), &clock), clock.0);
    }

    #[test]
    fn test_system_clock_advances() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        assert!(b >= a);
    }
}
