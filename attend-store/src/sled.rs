//! Sled persistent store
//!
//! Values are JSON encoded. The conditional writes the ledger contract
//! requires run inside sled transactions, so concurrent scans in one
//! process and across restarts see a single record per key.

use ::sled::transaction::{
    abort, ConflictableTransactionResult, TransactionError, Transactional,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::debug;

use attend_core::{
    sort_and_limit, ActivityCatalog, ActivityId, ActivitySchedule, AttendanceLedger,
    AttendanceRecord, NewRecord, OwnerId, ParticipantCredentials, ParticipantDirectory,
    ParticipantId, RecordArchive, RecordId, RecordKey, RecordQuery, StoreError, StoreResult,
};

use crate::types::{Activity, ActivityDraft, Participant, ParticipantRegistration};
use crate::{AttendanceStore, StorageConfig, StoreStats};

const PARTICIPANTS_TREE: &str = "participants";
const PARTICIPANT_BY_EXTERNAL_TREE: &str = "participant_by_external";
const ACTIVITIES_TREE: &str = "activities";
const RECORDS_TREE: &str = "records";
const RECORD_KEYS_TREE: &str = "record_keys";

/// Sled-backed store
#[derive(Debug, Clone)]
pub struct SledStore {
    db: ::sled::Db,
    participants: ::sled::Tree,
    participant_by_external: ::sled::Tree,
    activities: ::sled::Tree,
    records: ::sled::Tree,
    record_keys: ::sled::Tree,
}

impl SledStore {
    pub fn new(config: &StorageConfig) -> StoreResult<Self> {
        Self::open(&config.data_dir)
    }

    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = ::sled::open(path)
            .map_err(|e| StoreError::Storage(format!("Failed to open sled db: {}", e)))?;

        let open_tree = |name: &str| {
            db.open_tree(name)
                .map_err(|e| StoreError::Storage(format!("Failed to open {} tree: {}", name, e)))
        };

        Ok(Self {
            participants: open_tree(PARTICIPANTS_TREE)?,
            participant_by_external: open_tree(PARTICIPANT_BY_EXTERNAL_TREE)?,
            activities: open_tree(ACTIVITIES_TREE)?,
            records: open_tree(RECORDS_TREE)?,
            record_keys: open_tree(RECORD_KEYS_TREE)?,
            db,
        })
    }

    /// Remove all data
    pub fn clear(&self) -> StoreResult<()> {
        for tree in [
            &self.participants,
            &self.participant_by_external,
            &self.activities,
            &self.records,
            &self.record_keys,
        ] {
            tree.clear().map_err(Self::storage_error)?;
        }
        Ok(())
    }

    /// Flush to disk
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush().map_err(Self::storage_error)?;
        Ok(())
    }

    // ==================== Helpers ====================

    fn serialize<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn storage_error(e: ::sled::Error) -> StoreError {
        StoreError::Storage(e.to_string())
    }

    fn tx_error(e: TransactionError<StoreError>) -> StoreError {
        match e {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(inner) => {
                StoreError::Storage(format!("Transaction failed: {}", inner))
            }
        }
    }

    fn get<T: DeserializeOwned>(tree: &::sled::Tree, key: &[u8]) -> StoreResult<Option<T>> {
        match tree.get(key).map_err(Self::storage_error)? {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(tree: &::sled::Tree) -> StoreResult<Vec<T>> {
        let mut values = Vec::new();
        for item in tree.iter() {
            let (_, value) = item.map_err(Self::storage_error)?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl ParticipantDirectory for SledStore {
    async fn lookup_participant_by_external_id(
        &self,
        external_id: &str,
    ) -> StoreResult<Option<ParticipantCredentials>> {
        Ok(self
            .get_participant_by_external_id(external_id)
            .await?
            .map(|p| p.credentials()))
    }
}

#[async_trait]
impl ActivityCatalog for SledStore {
    async fn lookup_activity(&self, activity_id: &ActivityId) -> StoreResult<Option<ActivitySchedule>> {
        let activity: Option<Activity> = Self::get(&self.activities, activity_id.as_str().as_bytes())?;
        Ok(activity.map(|a| a.schedule()))
    }
}

#[async_trait]
impl AttendanceLedger for SledStore {
    async fn find_record(&self, key: &RecordKey) -> StoreResult<Option<AttendanceRecord>> {
        let Some(record_id) = self
            .record_keys
            .get(key.to_storage_key())
            .map_err(Self::storage_error)?
        else {
            return Ok(None);
        };
        Self::get(&self.records, &record_id)
    }

    async fn create_record(&self, record: NewRecord) -> StoreResult<AttendanceRecord> {
        let created = AttendanceRecord::from_new(RecordId::generate(), record);
        let key = created.key().to_storage_key();
        let id = created.record_id.as_str().as_bytes().to_vec();
        let value = Self::serialize(&created)?;

        (&self.record_keys, &self.records)
            .transaction(|(keys, records)| -> ConflictableTransactionResult<(), StoreError> {
                if keys.get(key.as_slice())?.is_some() {
                    return abort(StoreError::Conflict(format!(
                        "record already exists for {}",
                        created.participant_id
                    )));
                }
                keys.insert(key.as_slice(), id.as_slice())?;
                records.insert(id.as_slice(), value.as_slice())?;
                Ok(())
            })
            .map_err(Self::tx_error)?;

        debug!(record_id = %created.record_id, "Record created");
        Ok(created)
    }

    async fn set_departure(
        &self,
        record_id: &RecordId,
        departure: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord> {
        let id = record_id.as_str().as_bytes();

        self.records
            .transaction(|records| -> ConflictableTransactionResult<AttendanceRecord, StoreError> {
                let Some(bytes) = records.get(id)? else {
                    return abort(StoreError::NotFound(record_id.to_string()));
                };
                let mut record: AttendanceRecord = match Self::deserialize(&bytes) {
                    Ok(record) => record,
                    Err(e) => return abort(e),
                };
                if record.departure.is_some() {
                    return abort(StoreError::Conflict(format!("{} already departed", record_id)));
                }

                record.departure = Some(departure);
                let value = match Self::serialize(&record) {
                    Ok(value) => value,
                    Err(e) => return abort(e),
                };
                records.insert(id, value)?;
                Ok(record)
            })
            .map_err(Self::tx_error)
    }
}

#[async_trait]
impl RecordArchive for SledStore {
    async fn get_record(&self, record_id: &RecordId) -> StoreResult<Option<AttendanceRecord>> {
        Self::get(&self.records, record_id.as_str().as_bytes())
    }

    async fn list_records(&self, query: &RecordQuery) -> StoreResult<Vec<AttendanceRecord>> {
        let records: Vec<AttendanceRecord> = Self::scan(&self.records)?;
        let matching = records.into_iter().filter(|r| query.matches(r)).collect();
        Ok(sort_and_limit(matching, query.limit))
    }

    async fn delete_record(&self, record_id: &RecordId) -> StoreResult<bool> {
        let id = record_id.as_str().as_bytes();

        (&self.record_keys, &self.records)
            .transaction(|(keys, records)| -> ConflictableTransactionResult<bool, StoreError> {
                let Some(bytes) = records.remove(id)? else {
                    return Ok(false);
                };
                let record: AttendanceRecord = match Self::deserialize(&bytes) {
                    Ok(record) => record,
                    Err(e) => return abort(e),
                };
                keys.remove(record.key().to_storage_key())?;
                Ok(true)
            })
            .map_err(Self::tx_error)
    }
}

#[async_trait]
impl AttendanceStore for SledStore {
    // ==================== Participants ====================

    async fn register_participant(&self, registration: ParticipantRegistration) -> StoreResult<Participant> {
        let participant = Participant::enroll(registration)?;
        let external = participant.external_id.as_bytes();
        let id = participant.participant_id.as_str().as_bytes();
        let value = Self::serialize(&participant)?;

        (&self.participant_by_external, &self.participants)
            .transaction(|(by_external, participants)| -> ConflictableTransactionResult<(), StoreError> {
                if by_external.get(external)?.is_some() {
                    return abort(StoreError::Conflict(format!(
                        "participant {} already enrolled",
                        participant.external_id
                    )));
                }
                by_external.insert(external, id)?;
                participants.insert(id, value.as_slice())?;
                Ok(())
            })
            .map_err(Self::tx_error)?;

        Ok(participant)
    }

    async fn get_participant(&self, participant_id: &ParticipantId) -> StoreResult<Option<Participant>> {
        Self::get(&self.participants, participant_id.as_str().as_bytes())
    }

    async fn get_participant_by_external_id(&self, external_id: &str) -> StoreResult<Option<Participant>> {
        match self
            .participant_by_external
            .get(external_id.as_bytes())
            .map_err(Self::storage_error)?
        {
            Some(participant_id) => Self::get(&self.participants, &participant_id),
            None => Ok(None),
        }
    }

    async fn list_participants_by_owner(&self, owner_id: &OwnerId) -> StoreResult<Vec<Participant>> {
        let mut list: Vec<Participant> = Self::scan(&self.participants)?;
        list.retain(|p| p.is_on_roster_of(owner_id));
        list.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(list)
    }

    // ==================== Activities ====================

    async fn create_activity(&self, draft: ActivityDraft) -> StoreResult<Activity> {
        let activity = Activity::from_draft(ActivityId::generate(), draft)?;
        self.activities
            .insert(activity.activity_id.as_str().as_bytes(), Self::serialize(&activity)?)
            .map_err(Self::storage_error)?;
        Ok(activity)
    }

    async fn update_activity(&self, activity_id: &ActivityId, draft: ActivityDraft) -> StoreResult<Activity> {
        let existing: Activity = Self::get(&self.activities, activity_id.as_str().as_bytes())?
            .ok_or_else(|| StoreError::NotFound(activity_id.to_string()))?;
        let updated = existing.apply(draft)?;
        self.activities
            .insert(activity_id.as_str().as_bytes(), Self::serialize(&updated)?)
            .map_err(Self::storage_error)?;
        Ok(updated)
    }

    async fn delete_activity(&self, activity_id: &ActivityId) -> StoreResult<bool> {
        let removed = self
            .activities
            .remove(activity_id.as_str().as_bytes())
            .map_err(Self::storage_error)?;
        Ok(removed.is_some())
    }

    async fn get_activity(&self, activity_id: &ActivityId) -> StoreResult<Option<Activity>> {
        Self::get(&self.activities, activity_id.as_str().as_bytes())
    }

    async fn list_activities_by_owner(&self, owner_id: &OwnerId) -> StoreResult<Vec<Activity>> {
        let activities: Vec<Activity> = Self::scan(&self.activities)?;
        let mut list: Vec<_> = activities
            .into_iter()
            .filter(|a| &a.owner_id == owner_id)
            .collect();
        list.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(list)
    }

    // ==================== Maintenance ====================

    async fn get_stats(&self) -> StoreResult<StoreStats> {
        let records: Vec<AttendanceRecord> = Self::scan(&self.records)?;

        Ok(StoreStats {
            participants: self.participants.len() as u64,
            activities: self.activities.len() as u64,
            records: records.len() as u64,
            departed_records: records.iter().filter(|r| r.has_departed()).count() as u64,
        })
    }
}
