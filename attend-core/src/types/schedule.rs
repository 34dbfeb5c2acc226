//! Activity schedule

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Default grace period when an activity does not configure one
pub const DEFAULT_GRACE_PERIOD_MINUTES: u32 = 15;

/// Timing rules of an activity, as seen by the classifier and resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySchedule {
    /// Wall-clock start time, no date
    pub start_time: NaiveTime,
    /// Minutes after `start_time` that still count as present (inclusive)
    pub grace_period_minutes: u32,
    /// Whether a second scan on the same day records a departure
    pub allows_departure_scan: bool,
}

impl ActivitySchedule {
    pub fn new(start_time: NaiveTime, grace_period_minutes: u32, allows_departure_scan: bool) -> Self {
        Self {
            start_time,
            grace_period_minutes,
            allows_departure_scan,
        }
    }
}

/// Parse an `HH:MM` (or `HH:MM:SS`) wall-clock string
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("09:00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_time_of_day(" 17:30 "), NaiveTime::from_hms_opt(17, 30, 0));
        assert_eq!(parse_time_of_day("08:15:30"), NaiveTime::from_hms_opt(8, 15, 30));
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day("nine"), None);
    }
}
