//! Storage collaborator interfaces
//!
//! The engine never owns persistence. Everything it reads or writes goes
//! through these traits, which are injected into the resolver so that the
//! state machine can be exercised against in-memory fakes.
//!
//! # Atomicity contract
//!
//! - `create_record` MUST be a conditional create: if a record already
//!   exists for the [`RecordKey`], it fails with [`StoreError::Conflict`]
//!   and writes nothing.
//! - `set_departure` MUST be a conditional update: if the record already
//!   has a departure, it fails with [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{
    ActivityId, ActivitySchedule, AttendanceRecord, AttendanceStatus, NewRecord,
    ParticipantCredentials, ParticipantId, RecordId, RecordKey,
};

/// Participant lookup by the external ID carried in the QR payload
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn lookup_participant_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<ParticipantCredentials>>;
}

/// Activity schedule lookup
#[async_trait]
pub trait ActivityCatalog: Send + Sync {
    async fn lookup_activity(&self, activity_id: &ActivityId) -> StoreResult<Option<ActivitySchedule>>;
}

/// Attendance record storage used by the resolver
#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Get the record for a key, if any
    async fn find_record(&self, key: &RecordKey) -> StoreResult<Option<AttendanceRecord>>;

    /// Create-if-absent; `Conflict` when the key already has a record
    async fn create_record(&self, record: NewRecord) -> StoreResult<AttendanceRecord>;

    /// Set the departure once; `Conflict` when already departed,
    /// `NotFound` when the record does not exist
    async fn set_departure(
        &self,
        record_id: &RecordId,
        departure: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord>;
}

/// Filter for record listings
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Restrict to these activities (ownership scoping). `None` means no
    /// restriction; an empty list matches nothing.
    pub activity_ids: Option<Vec<ActivityId>>,
    pub participant_id: Option<ParticipantId>,
    pub status: Option<AttendanceStatus>,
    /// Inclusive lower bound on arrival
    pub arrival_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on arrival
    pub arrival_to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if let Some(ids) = &self.activity_ids {
            if !ids.contains(&record.activity_id) {
                return false;
            }
        }
        if let Some(participant_id) = &self.participant_id {
            if &record.participant_id != participant_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(from) = self.arrival_from {
            if record.arrival < from {
                return false;
            }
        }
        if let Some(to) = self.arrival_to {
            if record.arrival > to {
                return false;
            }
        }
        true
    }
}

/// Administrative access to stored records (listing, deletion)
#[async_trait]
pub trait RecordArchive: Send + Sync {
    async fn get_record(&self, record_id: &RecordId) -> StoreResult<Option<AttendanceRecord>>;

    /// Matching records, newest arrival first
    async fn list_records(&self, query: &RecordQuery) -> StoreResult<Vec<AttendanceRecord>>;

    /// Delete a record; returns false if it did not exist
    async fn delete_record(&self, record_id: &RecordId) -> StoreResult<bool>;
}

/// Order records newest arrival first and apply a limit
pub fn sort_and_limit(mut records: Vec<AttendanceRecord>, limit: Option<usize>) -> Vec<AttendanceRecord> {
    records.sort_by(|a, b| b.arrival.cmp(&a.arrival).then_with(|| a.record_id.cmp(&b.record_id)));
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn record(id: &str, activity: &str, hour: u32) -> AttendanceRecord {
        AttendanceRecord {
            record_id: RecordId::new(id),
            activity_id: ActivityId::new(activity),
            participant_id: ParticipantId::new("p1"),
            calendar_day: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            status: AttendanceStatus::Present,
            arrival: Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap(),
            departure: None,
        }
    }

    #[test]
    fn test_query_scoping() {
        let r = record("r1", "a1", 9);
        assert!(RecordQuery::default().matches(&r));

        let scoped = RecordQuery {
            activity_ids: Some(vec![ActivityId::new("a2")]),
            ..Default::default()
        };
        assert!(!scoped.matches(&r));

        let empty = RecordQuery {
            activity_ids: Some(Vec::new()),
            ..Default::default()
        };
        assert!(!empty.matches(&r));
    }

    #[test]
    fn test_query_time_bounds_are_inclusive() {
        let r = record("r1", "a1", 9);
        let query = RecordQuery {
            arrival_from: Some(r.arrival),
            arrival_to: Some(r.arrival),
            ..Default::default()
        };
        assert!(query.matches(&r));

        let later = RecordQuery {
            arrival_from: Some(Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(!later.matches(&r));
    }

    #[test]
    fn test_sort_newest_first() {
        let records = vec![record("r1", "a1", 8), record("r2", "a1", 10), record("r3", "a1", 9)];
        let sorted = sort_and_limit(records, Some(2));
        let ids: Vec<_> = sorted.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);
    }
}
