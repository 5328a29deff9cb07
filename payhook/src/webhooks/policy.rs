//! Receiver policy applied after a signature has been verified.
//!
//! Signature verification alone accepts a captured request forever. These checks narrow that:
//! [`check_freshness`] bounds how far the signed `date` may drift from the receiver's clock, and
//! [`ReplayGuard`] rejects a signature it has already accepted within its TTL.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moka::future::Cache;

use crate::errors::{Error, Result};

/// Replay entries outlive the skew window so a request cannot be replayed while still fresh.
const REPLAY_TTL_FACTOR: u32 = 2;
/// TTL used when replay protection is enabled without a clock-skew bound.
pub const DEFAULT_REPLAY_TTL: Duration = Duration::from_secs(3600);

/// Parse an HTTP date such as `Mon, 01 Jan 2024 00:00:00 GMT`.
pub fn parse_http_date(date: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(date).ok().map(|d| d.with_timezone(&Utc))
}

/// Reject `date` if it cannot be parsed or is more than `max_skew` away from `now`.
pub fn check_freshness(date: &str, now: DateTime<Utc>, max_skew: Duration) -> Result<()> {
    let stale = || Error::StaleRequest { date: date.to_string() };

    let sent_at = parse_http_date(date).ok_or_else(stale)?;
    let max_skew = TimeDelta::from_std(max_skew).unwrap_or(TimeDelta::MAX);

    if (now - sent_at).abs() > max_skew {
        return Err(stale());
    }
    Ok(())
}

/// Bounded memory of recently accepted signatures.
#[derive(Clone)]
pub struct ReplayGuard {
    seen: Cache<String, ()>,
}

impl ReplayGuard {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            seen: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
        }
    }

    /// TTL follows the clock-skew window when one is configured.
    pub fn for_skew(capacity: u64, max_clock_skew: Option<Duration>) -> Self {
        let ttl = max_clock_skew.map_or(DEFAULT_REPLAY_TTL, |skew| skew * REPLAY_TTL_FACTOR);
        Self::new(capacity, ttl)
    }

    /// Record `signature`, failing if it was already recorded.
    ///
    /// Signatures are compared the way the verifier reads them: surrounding whitespace ignored,
    /// hex digits case-insensitive.
    pub async fn check_and_record(&self, signature: &str) -> Result<()> {
        let key = signature.trim().to_ascii_lowercase();
        let entry = self.seen.entry(key).or_insert(()).await;
        if entry.is_fresh() { Ok(()) } else { Err(Error::ReplayDetected) }
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("entries", &self.seen.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DATE: &str = "Mon, 01 Jan 2024 00:00:00 GMT";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_parse_http_date() {
        assert_eq!(parse_http_date(DATE), Some(at(0)));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_fresh_within_window() {
        let skew = Duration::from_secs(300);
        assert!(check_freshness(DATE, at(0), skew).is_ok());
        assert!(check_freshness(DATE, at(300), skew).is_ok());
        assert!(check_freshness(DATE, at(-300), skew).is_ok());
    }

    #[test]
    fn test_stale_outside_window() {
        let skew = Duration::from_secs(300);
        assert!(matches!(check_freshness(DATE, at(301), skew), Err(Error::StaleRequest { .. })));
        // dates from the future are rejected too
        assert!(matches!(check_freshness(DATE, at(-301), skew), Err(Error::StaleRequest { .. })));
    }

    #[test]
    fn test_unparseable_date_is_stale() {
        let err = check_freshness("not a date", at(0), Duration::from_secs(300)).unwrap_err();
        assert!(matches!(err, Error::StaleRequest { date } if date == "not a date"));
    }

    #[tokio::test]
    async fn test_replay_guard_rejects_repeats() {
        let guard = ReplayGuard::new(100, Duration::from_secs(60));

        guard.check_and_record("aa").await.unwrap();
        guard.check_and_record("bb").await.unwrap();
        assert!(matches!(guard.check_and_record("aa").await, Err(Error::ReplayDetected)));
    }

    #[tokio::test]
    async fn test_replay_guard_ignores_case_and_padding() {
        let guard = ReplayGuard::new(100, Duration::from_secs(60));

        guard.check_and_record("abcdef").await.unwrap();
        assert!(matches!(guard.check_and_record("ABCDEF").await, Err(Error::ReplayDetected)));
        assert!(matches!(guard.check_and_record(" AbCdEf\t").await, Err(Error::ReplayDetected)));
    }

    #[tokio::test]
    async fn test_replay_guard_clones_share_state() {
        let guard = ReplayGuard::for_skew(100, Some(Duration::from_secs(30)));
        let clone = guard.clone();

        guard.check_and_record("aa").await.unwrap();
        assert!(clone.check_and_record("aa").await.is_err());
    }
}
