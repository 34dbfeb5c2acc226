//! Schedule Classifier
//!
//! Decides PRESENT vs LATE for an arrival. The scheduled start is always
//! anchored to the arrival's own local calendar date: a scan at 00:05 is
//! compared against that new day's start time, never the previous day's.
//! Callers that need overnight semantics pass the anchor date explicitly
//! through [`classify_on`].

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

use crate::types::{ActivitySchedule, AttendanceStatus};

/// Classify an arrival against `start_time` on the arrival's own date
pub fn classify<Tz: TimeZone>(
    arrival: &DateTime<Tz>,
    start_time: NaiveTime,
    grace_period_minutes: u32,
) -> AttendanceStatus {
    classify_on(arrival, arrival.date_naive(), start_time, grace_period_minutes)
}

/// Classify an arrival against `start_time` on an explicit anchor date
///
/// Present iff the arrival is at most `grace_period_minutes` after the
/// scheduled start (inclusive). Early arrivals are always present. Never
/// returns [`AttendanceStatus::Absent`].
pub fn classify_on<Tz: TimeZone>(
    arrival: &DateTime<Tz>,
    day: NaiveDate,
    start_time: NaiveTime,
    grace_period_minutes: u32,
) -> AttendanceStatus {
    let elapsed = time_after_start(arrival, day, start_time);
    if elapsed <= Duration::minutes(i64::from(grace_period_minutes)) {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

/// Classify against a full activity schedule
pub fn classify_for_schedule<Tz: TimeZone>(
    arrival: &DateTime<Tz>,
    schedule: &ActivitySchedule,
) -> AttendanceStatus {
    classify(arrival, schedule.start_time, schedule.grace_period_minutes)
}

/// Signed time between the scheduled start and the arrival
///
/// Negative for early arrivals.
pub fn time_after_start<Tz: TimeZone>(
    arrival: &DateTime<Tz>,
    day: NaiveDate,
    start_time: NaiveTime,
) -> Duration {
    let start_local = scheduled_start_local(day, start_time);
    match arrival.timezone().from_local_datetime(&start_local) {
        LocalResult::Single(start) => arrival.clone().signed_duration_since(start),
        // Clocks fell back: the first occurrence is the scheduled one
        LocalResult::Ambiguous(earliest, _) => arrival.clone().signed_duration_since(earliest),
        // Clocks sprang forward over the start time: compare wall clocks
        LocalResult::None => arrival.naive_local().signed_duration_since(start_local),
    }
}

/// Minutes late, rounded down; zero for on-time or early arrivals
pub fn minutes_late<Tz: TimeZone>(arrival: &DateTime<Tz>, start_time: NaiveTime) -> i64 {
    time_after_start(arrival, arrival.date_naive(), start_time)
        .num_minutes()
        .max(0)
}

/// Start time on `day` with seconds dropped
fn scheduled_start_local(day: NaiveDate, start_time: NaiveTime) -> NaiveDateTime {
    let hm = NaiveTime::from_hms_opt(start_time.hour(), start_time.minute(), 0).unwrap_or(start_time);
    day.and_time(hm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
    }

    #[test]
    fn test_grace_boundary_is_inclusive() {
        assert_eq!(classify(&at(9, 15, 0), nine(), 15), AttendanceStatus::Present);
        assert_eq!(classify(&at(9, 16, 0), nine(), 15), AttendanceStatus::Late);
    }

    #[test]
    fn test_fractional_minutes_past_grace_are_late() {
        assert_eq!(classify(&at(9, 15, 1), nine(), 15), AttendanceStatus::Late);
        assert_eq!(classify(&at(9, 14, 59), nine(), 15), AttendanceStatus::Present);
    }

    #[test]
    fn test_early_arrival_is_present() {
        assert_eq!(classify(&at(8, 55, 0), nine(), 15), AttendanceStatus::Present);
        assert_eq!(classify(&at(0, 0, 0), nine(), 0), AttendanceStatus::Present);
    }

    #[test]
    fn test_zero_grace() {
        assert_eq!(classify(&at(9, 0, 0), nine(), 0), AttendanceStatus::Present);
        assert_eq!(classify(&at(9, 0, 30), nine(), 0), AttendanceStatus::Late);
    }

    #[test]
    fn test_start_seconds_are_ignored() {
        let start = NaiveTime::from_hms_opt(9, 0, 45).unwrap();
        assert_eq!(classify(&at(9, 15, 0), start, 15), AttendanceStatus::Present);
        assert_eq!(classify(&at(9, 15, 30), start, 15), AttendanceStatus::Late);
    }

    #[test]
    fn test_scenarios() {
        assert_eq!(classify(&at(9, 10, 0), nine(), 15), AttendanceStatus::Present);
        assert_eq!(classify(&at(9, 20, 0), nine(), 15), AttendanceStatus::Late);
    }

    #[test]
    fn test_anchors_to_arrival_day_after_midnight() {
        // Evening class at 23:30; a scan at 00:05 belongs to the new day
        // and is early for that day's session.
        let start = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        let after_midnight = Utc.with_ymd_and_hms(2026, 3, 3, 0, 5, 0).unwrap();
        assert_eq!(classify(&after_midnight, start, 15), AttendanceStatus::Present);

        // Anchoring explicitly to the previous day makes it 35 minutes late
        let previous = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(
            classify_on(&after_midnight, previous, start, 15),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn test_uses_arrival_timezone_wall_clock() {
        // 01:10 UTC is 09:10 at UTC+8
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let arrival = Utc.with_ymd_and_hms(2026, 3, 2, 1, 10, 0).unwrap().with_timezone(&tz);
        assert_eq!(classify(&arrival, nine(), 15), AttendanceStatus::Present);

        let late = Utc.with_ymd_and_hms(2026, 3, 2, 1, 20, 0).unwrap().with_timezone(&tz);
        assert_eq!(classify(&late, nine(), 15), AttendanceStatus::Late);
    }

    #[test]
    fn test_minutes_late() {
        assert_eq!(minutes_late(&at(9, 20, 59), nine()), 20);
        assert_eq!(minutes_late(&at(8, 0, 0), nine()), 0);
    }

    #[test]
    fn test_classify_for_schedule() {
        let schedule = ActivitySchedule::new(nine(), 5, false);
        assert_eq!(classify_for_schedule(&at(9, 5, 0), &schedule), AttendanceStatus::Present);
        assert_eq!(classify_for_schedule(&at(9, 6, 0), &schedule), AttendanceStatus::Late);
    }
}
