//! Attendance Session Resolver
//!
//! Turns a scanned payload into at most one record mutation. Per
//! `(activity, participant, calendar day)` the record moves through:
//!
//! ```text
//! NoRecord --first scan--> Arrived --second scan (if allowed)--> Departed
//! ```
//!
//! | Current state | Departure scans allowed | Result |
//! |---------------|-------------------------|--------|
//! | NoRecord      | either                  | create record, `Arrived` |
//! | Arrived       | yes                     | set departure, `Departed` |
//! | Arrived       | no                      | `AlreadyArrived`, no write |
//! | Departed      | either                  | `AlreadyDeparted`, no write |
//!
//! Races are settled by the store's conditional writes: a `Conflict` on
//! create or departure is reported as the matching "already" outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::classify::classify;
use crate::codec::{self, QrPayload};
use crate::error::{AttendanceError, AttendanceResult, StoreError};
use crate::logging::operations;
use crate::policy::ScanPolicy;
use crate::store::{ActivityCatalog, AttendanceLedger, ParticipantDirectory};
use crate::types::{
    ActivityId, ActivitySchedule, AttendanceRecord, AttendanceStatus, NewRecord, RecordKey,
    SessionState,
};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// First scan of the day; a record was created
    Arrived { record: AttendanceRecord },
    /// Second scan of the day; departure recorded
    Departed { record: AttendanceRecord },
    /// Repeat scan while arrived and departures are not tracked
    AlreadyArrived { record: AttendanceRecord },
    /// Any scan after the departure was recorded
    AlreadyDeparted { record: AttendanceRecord },
    /// Scanned text is not a QR payload
    InvalidQrFormat,
    /// Payload is well-formed but its signature does not match
    InvalidSignature,
    ParticipantNotFound,
    ActivityNotFound,
    /// Authentic payload older than the enforced maximum age
    Expired,
}

impl ScanOutcome {
    /// Stable snake_case name, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Arrived { .. } => "arrived",
            Self::Departed { .. } => "departed",
            Self::AlreadyArrived { .. } => "already_arrived",
            Self::AlreadyDeparted { .. } => "already_departed",
            Self::InvalidQrFormat => "invalid_qr_format",
            Self::InvalidSignature => "invalid_signature",
            Self::ParticipantNotFound => "participant_not_found",
            Self::ActivityNotFound => "activity_not_found",
            Self::Expired => "expired",
        }
    }

    /// The record the outcome refers to, if any
    pub fn record(&self) -> Option<&AttendanceRecord> {
        match self {
            Self::Arrived { record }
            | Self::Departed { record }
            | Self::AlreadyArrived { record }
            | Self::AlreadyDeparted { record } => Some(record),
            _ => None,
        }
    }

    /// True if this scan mutated a record
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Arrived { .. } | Self::Departed { .. })
    }

    /// Operator-facing message; `name` is the participant's display name
    pub fn message(&self, name: &str) -> String {
        match self {
            Self::Arrived { record } => match record.status {
                AttendanceStatus::Late => format!("Late: {}", name),
                _ => format!("Present: {}", name),
            },
            Self::Departed { .. } => format!("Time-out recorded for {}", name),
            Self::AlreadyArrived { .. } => format!("{} already scanned in today", name),
            Self::AlreadyDeparted { .. } => format!("{} already scanned out today", name),
            Self::InvalidQrFormat => "Invalid QR code format".to_string(),
            Self::InvalidSignature => "Invalid QR code signature".to_string(),
            Self::ParticipantNotFound => "Participant not found".to_string(),
            Self::ActivityNotFound => "Activity not found".to_string(),
            Self::Expired => "QR code has expired".to_string(),
        }
    }

    fn already(record: AttendanceRecord) -> Self {
        if record.state().is_terminal() {
            Self::AlreadyDeparted { record }
        } else {
            Self::AlreadyArrived { record }
        }
    }
}

/// Scan resolver over injected storage collaborators
#[derive(Clone)]
pub struct ScanResolver {
    participants: Arc<dyn ParticipantDirectory>,
    activities: Arc<dyn ActivityCatalog>,
    ledger: Arc<dyn AttendanceLedger>,
    policy: ScanPolicy,
    clock: Arc<dyn Clock>,
}

impl ScanResolver {
    pub fn new(
        participants: Arc<dyn ParticipantDirectory>,
        activities: Arc<dyn ActivityCatalog>,
        ledger: Arc<dyn AttendanceLedger>,
    ) -> Self {
        Self {
            participants,
            activities,
            ledger,
            policy: ScanPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build from one store implementing every collaborator trait
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ParticipantDirectory + ActivityCatalog + AttendanceLedger + 'static,
    {
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn with_policy(mut self, policy: ScanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Resolve raw scanned text at the current instant
    pub async fn submit_scan(&self, raw: &str, activity_id: &ActivityId) -> AttendanceResult<ScanOutcome> {
        self.submit_scan_at(raw, activity_id, self.clock.now()).await
    }

    /// Resolve raw scanned text at an explicit instant
    pub async fn submit_scan_at(
        &self,
        raw: &str,
        activity_id: &ActivityId,
        at: DateTime<Utc>,
    ) -> AttendanceResult<ScanOutcome> {
        trace!(operation = operations::SCAN, raw_len = raw.len(), "Scan received");

        let payload = match codec::deserialize(raw) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(
                    operation = operations::SCAN,
                    activity_id = %activity_id,
                    error = %e,
                    "Rejected malformed QR payload"
                );
                return Ok(ScanOutcome::InvalidQrFormat);
            }
        };

        self.submit_payload_at(&payload, activity_id, at).await
    }

    /// Resolve an already-decoded payload at an explicit instant
    pub async fn submit_payload_at(
        &self,
        payload: &QrPayload,
        activity_id: &ActivityId,
        at: DateTime<Utc>,
    ) -> AttendanceResult<ScanOutcome> {
        let credentials = match self
            .participants
            .lookup_participant_by_external_id(&payload.participant_external_id)
            .await?
        {
            Some(credentials) => credentials,
            None => {
                debug!(
                    operation = operations::SCAN,
                    external_id = %payload.participant_external_id,
                    "Participant not found"
                );
                return Ok(ScanOutcome::ParticipantNotFound);
            }
        };

        if !codec::verify(payload, &credentials.secret) {
            warn!(
                operation = operations::VERIFY,
                participant_id = %credentials.participant_id,
                issued_at = payload.issued_at,
                "QR signature mismatch"
            );
            return Ok(ScanOutcome::InvalidSignature);
        }

        let expiry = self.policy.expiry;
        if expiry.enabled && codec::is_expired_at(payload, expiry.max_age_days, at.timestamp()) {
            debug!(
                operation = operations::VERIFY,
                participant_id = %credentials.participant_id,
                issued_at = payload.issued_at,
                max_age_days = expiry.max_age_days,
                "QR payload expired"
            );
            return Ok(ScanOutcome::Expired);
        }

        let schedule = match self.activities.lookup_activity(activity_id).await? {
            Some(schedule) => schedule,
            None => {
                debug!(operation = operations::SCAN, activity_id = %activity_id, "Activity not found");
                return Ok(ScanOutcome::ActivityNotFound);
            }
        };

        let key = RecordKey::new(
            activity_id.clone(),
            credentials.participant_id,
            self.policy.calendar_day(at),
        );
        self.resolve(key, &schedule, at).await
    }

    /// Apply the state machine for an authenticated scan
    pub async fn resolve(
        &self,
        key: RecordKey,
        schedule: &ActivitySchedule,
        at: DateTime<Utc>,
    ) -> AttendanceResult<ScanOutcome> {
        let existing = self.ledger.find_record(&key).await?;
        match (SessionState::of(existing.as_ref()), existing) {
            (SessionState::Arrived, Some(record)) if schedule.allows_departure_scan => {
                self.record_departure(record, at).await
            }
            (state, Some(record)) => {
                debug!(
                    operation = operations::SCAN,
                    record_id = %record.record_id,
                    state = ?state,
                    "Duplicate scan"
                );
                Ok(ScanOutcome::already(record))
            }
            (_, None) => self.record_arrival(key, schedule, at).await,
        }
    }

    async fn record_arrival(
        &self,
        key: RecordKey,
        schedule: &ActivitySchedule,
        at: DateTime<Utc>,
    ) -> AttendanceResult<ScanOutcome> {
        let local = self.policy.to_local(at);
        let status = classify(&local, schedule.start_time, schedule.grace_period_minutes);

        let new_record = NewRecord {
            key: key.clone(),
            arrival: at,
            status,
        };

        match self.ledger.create_record(new_record).await {
            Ok(record) => {
                info!(
                    operation = operations::ARRIVAL,
                    record_id = %record.record_id,
                    participant_id = %record.participant_id,
                    activity_id = %record.activity_id,
                    status = %record.status,
                    "Arrival recorded"
                );
                Ok(ScanOutcome::Arrived { record })
            }
            Err(StoreError::Conflict(_)) => {
                // Another scan created the record between our read and write
                let existing = self.ledger.find_record(&key).await?.ok_or_else(|| {
                    AttendanceError::Inconsistent(format!(
                        "create conflict but no record for {} / {} on {}",
                        key.activity_id, key.participant_id, key.calendar_day
                    ))
                })?;
                debug!(
                    operation = operations::ARRIVAL,
                    record_id = %existing.record_id,
                    "Lost arrival race, reporting existing record"
                );
                Ok(ScanOutcome::already(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn record_departure(
        &self,
        record: AttendanceRecord,
        at: DateTime<Utc>,
    ) -> AttendanceResult<ScanOutcome> {
        // Station clocks may disagree; never record a departure before arrival
        let departure = at.max(record.arrival);

        match self.ledger.set_departure(&record.record_id, departure).await {
            Ok(updated) => {
                info!(
                    operation = operations::DEPARTURE,
                    record_id = %updated.record_id,
                    participant_id = %updated.participant_id,
                    activity_id = %updated.activity_id,
                    "Departure recorded"
                );
                Ok(ScanOutcome::Departed { record: updated })
            }
            Err(StoreError::Conflict(_)) => {
                let key = record.key();
                let current = self.ledger.find_record(&key).await?.unwrap_or(record);
                Ok(ScanOutcome::AlreadyDeparted { record: current })
            }
            Err(e) => Err(e.into()),
        }
    }
}
