//! Scan policy configuration
//!
//! Supports loading from environment variables with the `ATTEND_` prefix.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;

/// Default maximum QR age when expiry is enforced
pub const DEFAULT_MAX_AGE_DAYS: u32 = 30;

/// QR expiry enforcement
///
/// Off by default: printed codes are commonly long-lived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    pub enabled: bool,
    pub max_age_days: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

impl ExpiryPolicy {
    pub fn enforced(max_age_days: u32) -> Self {
        Self {
            enabled: true,
            max_age_days,
        }
    }
}

/// Policy applied by the resolver to every scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPolicy {
    #[serde(default)]
    pub expiry: ExpiryPolicy,
    /// Offset of the venue's wall clock from UTC, in minutes. Defines both
    /// the calendar day of a record and the clock start times refer to.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            expiry: ExpiryPolicy::default(),
            utc_offset_minutes: 0,
        }
    }
}

impl ScanPolicy {
    /// Load policy from environment variables
    ///
    /// Environment variables:
    /// - ATTEND_ENFORCE_QR_EXPIRY: `true`/`1` to reject old codes
    /// - ATTEND_QR_MAX_AGE_DAYS: maximum code age in days (default 30)
    /// - ATTEND_UTC_OFFSET_MINUTES: venue offset from UTC (default 0)
    pub fn from_env() -> Self {
        let enabled = env::var("ATTEND_ENFORCE_QR_EXPIRY")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        let max_age_days = env::var("ATTEND_QR_MAX_AGE_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_AGE_DAYS);
        let utc_offset_minutes = env::var("ATTEND_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Self {
            expiry: ExpiryPolicy {
                enabled,
                max_age_days,
            },
            utc_offset_minutes,
        }
    }

    pub fn with_expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Venue timezone; out-of-range offsets fall back to UTC
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Convert an instant to venue wall-clock time
    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.timezone())
    }

    /// Venue calendar day of an instant
    pub fn calendar_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_policy() {
        let policy = ScanPolicy::default();
        assert!(!policy.expiry.enabled);
        assert_eq!(policy.expiry.max_age_days, 30);
        assert_eq!(policy.utc_offset_minutes, 0);
    }

    #[test]
    fn test_calendar_day_uses_offset() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 2, 23, 30, 0).unwrap();
        let utc = ScanPolicy::default();
        assert_eq!(utc.calendar_day(instant), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());

        let plus_two = ScanPolicy::default().with_utc_offset_minutes(120);
        assert_eq!(plus_two.calendar_day(instant), NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let policy = ScanPolicy::default().with_utc_offset_minutes(48 * 60);
        assert_eq!(policy.timezone().local_minus_utc(), 0);
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: ScanPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, ScanPolicy::default());
        let policy: ScanPolicy =
            serde_json::from_str(r#"{"expiry":{"enabled":true,"max_age_days":7}}"#).unwrap();
        assert_eq!(policy.expiry, ExpiryPolicy::enforced(7));
    }
}
