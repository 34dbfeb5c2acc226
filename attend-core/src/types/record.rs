//! Attendance record types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ActivityId, ParticipantId, RecordId};

/// Attendance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    /// Arrived no later than start + grace period
    Present,
    /// Arrived after the grace period
    Late,
    /// No scan at all; assigned by reconciliation outside the engine
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Late => "LATE",
            Self::Absent => "ABSENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PRESENT" => Some(Self::Present),
            "LATE" => Some(Self::Late),
            "ABSENT" => Some(Self::Absent),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uniqueness key: one record per activity, participant and calendar day
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub activity_id: ActivityId,
    pub participant_id: ParticipantId,
    pub calendar_day: NaiveDate,
}

impl RecordKey {
    pub fn new(activity_id: ActivityId, participant_id: ParticipantId, calendar_day: NaiveDate) -> Self {
        Self {
            activity_id,
            participant_id,
            calendar_day,
        }
    }

    /// Stable byte encoding for key-value stores
    pub fn to_storage_key(&self) -> Vec<u8> {
        format!(
            "{}\u{1f}{}\u{1f}{}",
            self.activity_id,
            self.participant_id,
            self.calendar_day.format("%Y-%m-%d")
        )
        .into_bytes()
    }
}

/// Where a record key sits in the per-day state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoRecord,
    Arrived,
    /// Terminal
    Departed,
}

impl SessionState {
    /// State of a key given its current record, if any
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        record.map_or(Self::NoRecord, AttendanceRecord::state)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Departed)
    }
}

/// One participant's attendance for one activity on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub record_id: RecordId,
    pub activity_id: ActivityId,
    pub participant_id: ParticipantId,
    pub calendar_day: NaiveDate,
    pub status: AttendanceStatus,
    pub arrival: DateTime<Utc>,
    pub departure: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    /// Materialize a record from a creation request
    pub fn from_new(record_id: RecordId, new: NewRecord) -> Self {
        Self {
            record_id,
            activity_id: new.key.activity_id,
            participant_id: new.key.participant_id,
            calendar_day: new.key.calendar_day,
            status: new.status,
            arrival: new.arrival,
            departure: None,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(
            self.activity_id.clone(),
            self.participant_id.clone(),
            self.calendar_day,
        )
    }

    pub fn state(&self) -> SessionState {
        if self.departure.is_some() {
            SessionState::Departed
        } else {
            SessionState::Arrived
        }
    }

    pub fn has_departed(&self) -> bool {
        self.departure.is_some()
    }
}

/// Creation request handed to [`crate::AttendanceLedger::create_record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub key: RecordKey,
    pub arrival: DateTime<Utc>,
    pub status: AttendanceStatus,
}
