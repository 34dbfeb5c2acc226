//! In-memory store
//!
//! Thread-safe maps behind `tokio::sync::RwLock`, used by tests and
//! development servers.
//!
//! Lock order is always index before primary map (`participant_by_external`
//! before `participants`, `record_keys` before `records`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use attend_core::{
    sort_and_limit, ActivityCatalog, ActivityId, ActivitySchedule, AttendanceLedger,
    AttendanceRecord, NewRecord, OwnerId, ParticipantCredentials, ParticipantDirectory,
    ParticipantId, RecordArchive, RecordId, RecordKey, RecordQuery, StoreError, StoreResult,
};

use crate::types::{Activity, ActivityDraft, Participant, ParticipantRegistration};
use crate::{AttendanceStore, StoreStats};

/// In-memory store
#[derive(Debug)]
pub struct MemoryStore {
    participants: Arc<RwLock<HashMap<ParticipantId, Participant>>>,
    activities: Arc<RwLock<HashMap<ActivityId, Activity>>>,
    records: Arc<RwLock<HashMap<RecordId, AttendanceRecord>>>,
    // Indexes
    participant_by_external: Arc<RwLock<HashMap<String, ParticipantId>>>,
    record_keys: Arc<RwLock<HashMap<RecordKey, RecordId>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            participants: Arc::new(RwLock::new(HashMap::new())),
            activities: Arc::new(RwLock::new(HashMap::new())),
            records: Arc::new(RwLock::new(HashMap::new())),
            participant_by_external: Arc::new(RwLock::new(HashMap::new())),
            record_keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Remove all data
    pub async fn clear(&self) {
        self.participant_by_external.write().await.clear();
        self.participants.write().await.clear();
        self.activities.write().await.clear();
        self.record_keys.write().await.clear();
        self.records.write().await.clear();
    }
}

#[async_trait]
impl ParticipantDirectory for MemoryStore {
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
impl ActivityCatalog for MemoryStore {
    async fn lookup_activity(&self, activity_id: &ActivityId) -> StoreResult<Option<ActivitySchedule>> {
        let activities = self.activities.read().await;
        Ok(activities.get(activity_id).map(Activity::schedule))
    }
}

#[async_trait]
impl AttendanceLedger for MemoryStore {
    async fn find_record(&self, key: &RecordKey) -> StoreResult<Option<AttendanceRecord>> {
        let record_keys = self.record_keys.read().await;
        let Some(record_id) = record_keys.get(key) else {
            return Ok(None);
        };
        let records = self.records.read().await;
        Ok(records.get(record_id).cloned())
    }

    async fn create_record(&self, record: NewRecord) -> StoreResult<AttendanceRecord> {
        // Check and insert under the same write guard
        let mut record_keys = self.record_keys.write().await;
        if record_keys.contains_key(&record.key) {
            return Err(StoreError::Conflict(format!(
                "record already exists for {}",
                record.key.participant_id
            )));
        }

        let created = AttendanceRecord::from_new(RecordId::generate(), record);
        let mut records = self.records.write().await;
        record_keys.insert(created.key(), created.record_id.clone());
        records.insert(created.record_id.clone(), created.clone());
        Ok(created)
    }

    async fn set_departure(
        &self,
        record_id: &RecordId,
        departure: DateTime<Utc>,
    ) -> StoreResult<AttendanceRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::NotFound(record_id.to_string()))?;

        if record.departure.is_some() {
            return Err(StoreError::Conflict(format!("{} already departed", record_id)));
        }
        record.departure = Some(departure);
        Ok(record.clone())
    }
}

#[async_trait]
impl RecordArchive for MemoryStore {
    async fn get_record(&self, record_id: &RecordId) -> StoreResult<Option<AttendanceRecord>> {
        let records = self.records.read().await;
        Ok(records.get(record_id).cloned())
    }

    async fn list_records(&self, query: &RecordQuery) -> StoreResult<Vec<AttendanceRecord>> {
        let records = self.records.read().await;
        let matching = records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok(sort_and_limit(matching, query.limit))
    }

    async fn delete_record(&self, record_id: &RecordId) -> StoreResult<bool> {
        let mut record_keys = self.record_keys.write().await;
        let mut records = self.records.write().await;
        match records.remove(record_id) {
            Some(removed) => {
                record_keys.remove(&removed.key());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    // ==================== Participants ====================

    async fn register_participant(&self, registration: ParticipantRegistration) -> StoreResult<Participant> {
        let participant = Participant::enroll(registration)?;

        let mut by_external = self.participant_by_external.write().await;
        if by_external.contains_key(&participant.external_id) {
            return Err(StoreError::Conflict(format!(
                "participant {} already enrolled",
                participant.external_id
            )));
        }

        let mut participants = self.participants.write().await;
        by_external.insert(participant.external_id.clone(), participant.participant_id.clone());
        participants.insert(participant.participant_id.clone(), participant.clone());
        Ok(participant)
    }

    async fn get_participant(&self, participant_id: &ParticipantId) -> StoreResult<Option<Participant>> {
        let participants = self.participants.read().await;
        Ok(participants.get(participant_id).cloned())
    }

    async fn get_participant_by_external_id(&self, external_id: &str) -> StoreResult<Option<Participant>> {
        let by_external = self.participant_by_external.read().await;
        let Some(participant_id) = by_external.get(external_id) else {
            return Ok(None);
        };
        let participants = self.participants.read().await;
        Ok(participants.get(participant_id).cloned())
    }

    async fn list_participants_by_owner(&self, owner_id: &OwnerId) -> StoreResult<Vec<Participant>> {
        let participants = self.participants.read().await;
        let mut list: Vec<_> = participants
            .values()
            .filter(|p| p.is_on_roster_of(owner_id))
            .cloned()
            .collect();
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
        let mut activities = self.activities.write().await;
        activities.insert(activity.activity_id.clone(), activity.clone());
        Ok(activity)
    }

    async fn update_activity(&self, activity_id: &ActivityId, draft: ActivityDraft) -> StoreResult<Activity> {
        let mut activities = self.activities.write().await;
        let existing = activities
            .get(activity_id)
            .ok_or_else(|| StoreError::NotFound(activity_id.to_string()))?;
        let updated = existing.apply(draft)?;
        activities.insert(activity_id.clone(), updated.clone());
        Ok(updated)
    }

    async fn delete_activity(&self, activity_id: &ActivityId) -> StoreResult<bool> {
        let mut activities = self.activities.write().await;
        Ok(activities.remove(activity_id).is_some())
    }

    async fn get_activity(&self, activity_id: &ActivityId) -> StoreResult<Option<Activity>> {
        let activities = self.activities.read().await;
        Ok(activities.get(activity_id).cloned())
    }

    async fn list_activities_by_owner(&self, owner_id: &OwnerId) -> StoreResult<Vec<Activity>> {
        let activities = self.activities.read().await;
        let mut list: Vec<_> = activities
            .values()
            .filter(|a| &a.owner_id == owner_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(list)
    }

    // ==================== Maintenance ====================

    async fn get_stats(&self) -> StoreResult<StoreStats> {
        let participants = self.participants.read().await.len() as u64;
        let activities = self.activities.read().await.len() as u64;
        let records = self.records.read().await;

        Ok(StoreStats {
            participants,
            activities,
            records: records.len() as u64,
            departed_records: records.values().filter(|r| r.has_departed()).count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attend_core::AttendanceStatus;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn registration(external_id: &str, last_name: &str) -> ParticipantRegistration {
        ParticipantRegistration {
            external_id: external_id.to_string(),
            first_name: "Test".to_string(),
            last_name: last_name.to_string(),
            email: None,
            section: "A".to_string(),
            owner_id: Some(OwnerId::new("owner-1")),
        }
    }

    fn draft(owner: &str, title: &str) -> ActivityDraft {
        ActivityDraft {
            owner_id: OwnerId::new(owner),
            title: title.to_string(),
            description: None,
            schedule_label: "MWF".to_string(),
            room: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            grace_period_minutes: Some(10),
            allows_departure_scan: Some(true),
        }
    }

    fn new_record(activity: &str, participant: &str) -> NewRecord {
        NewRecord {
            key: RecordKey::new(
                ActivityId::new(activity),
                ParticipantId::new(participant),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            ),
            arrival: Utc.with_ymd_and_hms(2026, 3, 2, 9, 5, 0).unwrap(),
            status: AttendanceStatus::Present,
        }
    }

    #[tokio::test]
    async fn test_participant_enrollment() {
        let store = MemoryStore::new();
        let participant = store.register_participant(registration("S-1", "Hopper")).await.unwrap();

        let credentials = store
            .lookup_participant_by_external_id("S-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credentials.participant_id, participant.participant_id);
        assert_eq!(credentials.secret, participant.secret);

        assert!(store.lookup_participant_by_external_id("S-2").await.unwrap().is_none());

        let duplicate = store.register_participant(registration("S-1", "Other")).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_participants_sorted_by_last_name() {
        let store = MemoryStore::new();
        store.register_participant(registration("S-1", "Turing")).await.unwrap();
        store.register_participant(registration("S-2", "Hopper")).await.unwrap();

        let names: Vec<_> = store
            .list_participants_by_owner(&OwnerId::new("owner-1"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.last_name)
            .collect();
        assert_eq!(names, vec!["Hopper", "Turing"]);
    }

    #[tokio::test]
    async fn test_roster_is_scoped_to_owner() {
        let store = MemoryStore::new();
        store.register_participant(registration("S-1", "Turing")).await.unwrap();

        let mut other = registration("S-2", "Hopper");
        other.owner_id = Some(OwnerId::new("owner-2"));
        store.register_participant(other).await.unwrap();

        let mut unassigned = registration("S-3", "Lovelace");
        unassigned.owner_id = None;
        store.register_participant(unassigned).await.unwrap();

        let roster = store
            .list_participants_by_owner(&OwnerId::new("owner-1"))
            .await
            .unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].external_id, "S-1");

        let roster = store
            .list_participants_by_owner(&OwnerId::new("owner-2"))
            .await
            .unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].external_id, "S-2");

        assert!(store
            .list_participants_by_owner(&OwnerId::new("nobody"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_activity_crud() {
        let store = MemoryStore::new();
        let activity = store.create_activity(draft("owner-1", "Networks")).await.unwrap();

        let schedule = store.lookup_activity(&activity.activity_id).await.unwrap().unwrap();
        assert_eq!(schedule.grace_period_minutes, 10);
        assert!(schedule.allows_departure_scan);

        let mut update = draft("owner-1", "Networks II");
        update.grace_period_minutes = None;
        let updated = store.update_activity(&activity.activity_id, update).await.unwrap();
        assert_eq!(updated.title, "Networks II");
        assert_eq!(updated.grace_period_minutes, 15);

        let missing = store
            .update_activity(&ActivityId::new("missing"), draft("owner-1", "X"))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        assert!(store.delete_activity(&activity.activity_id).await.unwrap());
        assert!(!store.delete_activity(&activity.activity_id).await.unwrap());
        assert!(store.lookup_activity(&activity.activity_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activities_scoped_by_owner() {
        let store = MemoryStore::new();
        store.create_activity(draft("owner-1", "Databases")).await.unwrap();
        store.create_activity(draft("owner-1", "Compilers")).await.unwrap();
        store.create_activity(draft("owner-2", "Graphics")).await.unwrap();

        let titles: Vec<_> = store
            .list_activities_by_owner(&OwnerId::new("owner-1"))
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Compilers", "Databases"]);
        assert!(store
            .list_activities_by_owner(&OwnerId::new("nobody"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_create_record_is_conditional() {
        let store = MemoryStore::new();
        let created = store.create_record(new_record("a1", "p1")).await.unwrap();

        let again = store.create_record(new_record("a1", "p1")).await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));

        let found = store.find_record(&created.key()).await.unwrap().unwrap();
        assert_eq!(found, created);

        // Different activity, same participant and day
        store.create_record(new_record("a2", "p1")).await.unwrap();
        assert_eq!(store.get_stats().await.unwrap().records, 2);
    }

    #[tokio::test]
    async fn test_set_departure_once() {
        let store = MemoryStore::new();
        let created = store.create_record(new_record("a1", "p1")).await.unwrap();
        let departure = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();

        let departed = store.set_departure(&created.record_id, departure).await.unwrap();
        assert_eq!(departed.departure, Some(departure));

        let again = store.set_departure(&created.record_id, departure).await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));

        let missing = store.set_departure(&RecordId::new("missing"), departure).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        assert_eq!(store.get_stats().await.unwrap().departed_records, 1);
    }

    #[tokio::test]
    async fn test_delete_record_frees_key() {
        let store = MemoryStore::new();
        let created = store.create_record(new_record("a1", "p1")).await.unwrap();

        assert!(store.delete_record(&created.record_id).await.unwrap());
        assert!(!store.delete_record(&created.record_id).await.unwrap());
        assert!(store.find_record(&created.key()).await.unwrap().is_none());

        store.create_record(new_record("a1", "p1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_records_filters() {
        let store = MemoryStore::new();
        store.create_record(new_record("a1", "p1")).await.unwrap();
        store.create_record(new_record("a1", "p2")).await.unwrap();
        store.create_record(new_record("a2", "p1")).await.unwrap();

        let query = RecordQuery {
            activity_ids: Some(vec![ActivityId::new("a1")]),
            ..Default::default()
        };
        assert_eq!(store.list_records(&query).await.unwrap().len(), 2);

        let query = RecordQuery {
            participant_id: Some(ParticipantId::new("p1")),
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(store.list_records(&query).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_single_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_record(new_record("a1", "p1")).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.get_stats().await.unwrap().records, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        store.register_participant(registration("S-1", "Hopper")).await.unwrap();
        store.create_record(new_record("a1", "p1")).await.unwrap();

        store.clear().await;
        assert_eq!(store.get_stats().await.unwrap(), StoreStats::default());
    }
}
