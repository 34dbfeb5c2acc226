//! Attendance reporting helpers
//!
//! Calendar ranges for filtering and summary statistics over records.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AttendanceRecord, AttendanceStatus};

/// Reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

/// Inclusive instant range covering whole local calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    /// Last millisecond of the range
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Range for `period` containing `date`
    pub fn for_period(period: Period, date: NaiveDate, tz: &FixedOffset) -> Self {
        match period {
            Period::Day => Self::day(date, tz),
            Period::Week => Self::week(date, tz),
            Period::Month => Self::month(date, tz),
        }
    }

    /// 00:00:00.000 to 23:59:59.999 on `date`
    pub fn day(date: NaiveDate, tz: &FixedOffset) -> Self {
        Self::days(date, 1, tz)
    }

    /// Monday to Sunday of the week containing `date`
    pub fn week(date: NaiveDate, tz: &FixedOffset) -> Self {
        let from_monday = i64::from(date.weekday().num_days_from_monday());
        Self::days(date - Duration::days(from_monday), 7, tz)
    }

    /// First to last day of the month containing `date`
    pub fn month(date: NaiveDate, tz: &FixedOffset) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let next_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        };
        let days = next_first
            .map(|next| (next - first).num_days())
            .unwrap_or(31);
        Self::days(first, days, tz)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    fn days(first: NaiveDate, count: i64, tz: &FixedOffset) -> Self {
        let start = local_midnight(first, tz);
        let end = local_midnight(first + Duration::days(count), tz) - Duration::milliseconds(1);
        Self { start, end }
    }
}

fn local_midnight(date: NaiveDate, tz: &FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    // Fixed offsets have exactly one mapping for every local time
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Attendance summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub total: u64,
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    /// (present + late) / total as a percentage, one decimal place
    pub percentage: f64,
}

impl AttendanceStats {
    pub fn from_counts(present: u64, late: u64, absent: u64) -> Self {
        let total = present + late + absent;
        let percentage = if total > 0 {
            ((present + late) as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self {
            total,
            present,
            late,
            absent,
            percentage: (percentage * 10.0).round() / 10.0,
        }
    }

    pub fn summarize<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let (mut present, mut late, mut absent) = (0, 0, 0);
        for record in records {
            match record.status {
                AttendanceStatus::Present => present += 1,
                AttendanceStatus::Late => late += 1,
                AttendanceStatus::Absent => absent += 1,
            }
        }
        Self::from_counts(present, late, absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityId, ParticipantId, RecordId};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stats_percentage() {
        let stats = AttendanceStats::from_counts(2, 0, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.percentage, 66.7);

        let stats = AttendanceStats::from_counts(1, 1, 0);
        assert_eq!(stats.percentage, 100.0);

        assert_eq!(AttendanceStats::from_counts(0, 0, 0).percentage, 0.0);
    }

    #[test]
    fn test_summarize_records() {
        let base = AttendanceRecord {
            record_id: RecordId::new("r"),
            activity_id: ActivityId::new("a"),
            participant_id: ParticipantId::new("p"),
            calendar_day: date(2026, 3, 2),
            status: AttendanceStatus::Present,
            arrival: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            departure: None,
        };
        let mut late = base.clone();
        late.status = AttendanceStatus::Late;

        let stats = AttendanceStats::summarize(&[base.clone(), base, late]);
        assert_eq!(stats.present, 2);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.percentage, 100.0);
    }

    #[test]
    fn test_day_range() {
        let range = DateRange::day(date(2026, 3, 2), &utc());
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2026, 3, 2, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_day_range_respects_offset() {
        let plus_eight = FixedOffset::east_opt(8 * 3600).unwrap();
        let range = DateRange::day(date(2026, 3, 2), &plus_eight);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_week_starts_monday() {
        // 2026-03-08 is a Sunday; its week starts Monday 2026-03-02
        let range = DateRange::week(date(2026, 3, 8), &utc());
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2026, 3, 8, 23, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_month_range() {
        let range = DateRange::month(date(2026, 2, 14), &utc());
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()));

        let december = DateRange::for_period(Period::Month, date(2026, 12, 31), &utc());
        assert!(december.contains(Utc.with_ymd_and_hms(2026, 12, 31, 23, 0, 0).unwrap()));
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!(Period::from_str("Week"), Some(Period::Week));
        assert_eq!(Period::from_str("year"), None);
    }
}
