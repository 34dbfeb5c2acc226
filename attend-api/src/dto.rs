//! Data Transfer Objects for API requests and responses

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use attend_core::{AttendanceRecord, ScanOutcome};
use attend_store::{Activity, Participant};

// ============ Scan DTOs ============

/// Submit scan request
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Raw text decoded from the QR code
    pub payload: String,
    /// Activity the scanning station is taking attendance for
    pub activity_id: String,
    /// Scanning station; enables repeat-read suppression when present
    pub station_id: Option<String>,
}

/// Scan response
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// Outcome name (`arrived`, `already_arrived`, `invalid_signature`, ...)
    /// or `debounced` for a suppressed repeat read
    pub outcome: String,
    /// True if a record was created or updated
    pub accepted: bool,
    pub message: String,
    pub record: Option<RecordResponse>,
}

impl ScanResponse {
    pub fn from_outcome(outcome: &ScanOutcome, participant_name: &str) -> Self {
        Self {
            outcome: outcome.kind().to_string(),
            accepted: outcome.is_accepted(),
            message: outcome.message(participant_name),
            record: outcome.record().map(RecordResponse::from),
        }
    }

    pub fn debounced() -> Self {
        Self {
            outcome: "debounced".to_string(),
            accepted: false,
            message: "Repeat read ignored".to_string(),
            record: None,
        }
    }
}

// ============ Record DTOs ============

/// Attendance record response
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub record_id: String,
    pub activity_id: String,
    pub participant_id: String,
    pub calendar_day: NaiveDate,
    pub status: String,
    pub arrival: DateTime<Utc>,
    pub departure: Option<DateTime<Utc>>,
}

impl From<&AttendanceRecord> for RecordResponse {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            record_id: record.record_id.to_string(),
            activity_id: record.activity_id.to_string(),
            participant_id: record.participant_id.to_string(),
            calendar_day: record.calendar_day,
            status: record.status.as_str().to_string(),
            arrival: record.arrival,
            departure: record.departure,
        }
    }
}

/// Attendance listing query
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceQuery {
    /// Only records of this owner's activities; required
    pub owner_id: Option<String>,
    pub activity_id: Option<String>,
    pub participant_id: Option<String>,
    /// PRESENT, LATE or ABSENT
    pub status: Option<String>,
    /// Local calendar date (YYYY-MM-DD)
    pub date: Option<NaiveDate>,
    /// day, week or month around `date` (default day)
    pub period: Option<String>,
    pub limit: Option<usize>,
}

/// Record deletion response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}

// ============ Participant DTOs ============

/// Enroll participant request
#[derive(Debug, Deserialize)]
pub struct RegisterParticipantRequest {
    /// Identifier printed in the QR code (e.g. student number)
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub section: String,
    /// Put the participant on this owner's roster
    pub owner_id: Option<String>,
}

/// Participant response (the secret is never returned)
#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub participant_id: String,
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub section: String,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Participant> for ParticipantResponse {
    fn from(p: &Participant) -> Self {
        Self {
            participant_id: p.participant_id.to_string(),
            external_id: p.external_id.clone(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            email: p.email.clone(),
            section: p.section.clone(),
            owner_id: p.owner_id.as_ref().map(|o| o.to_string()),
            created_at: p.created_at,
        }
    }
}

/// Issued QR payload
#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub participant_id: String,
    pub external_id: String,
    /// Text to encode in the QR image
    pub payload: String,
    pub issued_at: i64,
}

// ============ Activity DTOs ============

/// Create or update activity request
#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub schedule_label: String,
    pub room: Option<String>,
    /// HH:MM or HH:MM:SS
    pub start_time: String,
    /// HH:MM or HH:MM:SS
    pub end_time: String,
    pub grace_period_minutes: Option<u32>,
    pub allows_departure_scan: Option<bool>,
}

/// Activity response
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub activity_id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub schedule_label: String,
    pub room: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub grace_period_minutes: u32,
    pub allows_departure_scan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Activity> for ActivityResponse {
    fn from(a: &Activity) -> Self {
        Self {
            activity_id: a.activity_id.to_string(),
            owner_id: a.owner_id.to_string(),
            title: a.title.clone(),
            description: a.description.clone(),
            schedule_label: a.schedule_label.clone(),
            room: a.room.clone(),
            start_time: a.start_time.format("%H:%M").to_string(),
            end_time: a.end_time.format("%H:%M").to_string(),
            grace_period_minutes: a.grace_period_minutes,
            allows_departure_scan: a.allows_departure_scan,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Owner-scoped listing query
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}

// ============ Common DTOs ============

/// List response
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub participants: u64,
    pub activities: u64,
    pub records: u64,
}
