//! Attend Store - reference storage collaborators
//!
//! Implements the engine's collaborator traits plus the enrollment and
//! activity catalog operations the engine treats as external.
//!
//! # Backends
//!
//! - [`MemoryStore`]: `tokio::sync::RwLock` maps, for tests and development
//! - [`SledStore`]: sled embedded database, for single-node deployments
//!
//! Both honour the conditional-write contract of
//! [`attend_core::AttendanceLedger`]: creation is create-if-absent on the
//! `(activity, participant, day)` key and a departure can be set only once.

pub mod memory;
pub mod sled;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

use attend_core::{
    ActivityCatalog, ActivityId, AttendanceLedger, OwnerId, ParticipantDirectory, ParticipantId,
    RecordArchive, StoreResult,
};

pub use memory::MemoryStore;
pub use self::sled::SledStore;
pub use types::*;

/// Full storage interface: the engine's collaborators plus administration
#[async_trait]
pub trait AttendanceStore:
    ParticipantDirectory + ActivityCatalog + AttendanceLedger + RecordArchive
{
    // ==================== Participants ====================

    /// Enroll a participant and generate their secret.
    /// `Conflict` if the external ID is taken.
    async fn register_participant(&self, registration: ParticipantRegistration) -> StoreResult<Participant>;

    async fn get_participant(&self, participant_id: &ParticipantId) -> StoreResult<Option<Participant>>;

    async fn get_participant_by_external_id(&self, external_id: &str) -> StoreResult<Option<Participant>>;

    /// Participants on one owner's roster ordered by last name
    async fn list_participants_by_owner(&self, owner_id: &OwnerId) -> StoreResult<Vec<Participant>>;

    // ==================== Activities ====================

    async fn create_activity(&self, draft: ActivityDraft) -> StoreResult<Activity>;

    /// `NotFound` if the activity does not exist
    async fn update_activity(&self, activity_id: &ActivityId, draft: ActivityDraft) -> StoreResult<Activity>;

    /// Returns false if the activity did not exist
    async fn delete_activity(&self, activity_id: &ActivityId) -> StoreResult<bool>;

    async fn get_activity(&self, activity_id: &ActivityId) -> StoreResult<Option<Activity>>;

    /// Activities of one owner ordered by title
    async fn list_activities_by_owner(&self, owner_id: &OwnerId) -> StoreResult<Vec<Activity>>;

    // ==================== Maintenance ====================

    async fn get_stats(&self) -> StoreResult<StoreStats>;
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub participants: u64,
    pub activities: u64,
    pub records: u64,
    /// Records with a departure set
    pub departed_records: u64,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sled,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "sled" => Some(Self::Sled),
            _ => None,
        }
    }
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Data directory (sled only)
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: "./attend_data".to_string(),
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - ATTEND_STORAGE: `memory` or `sled`
    /// - ATTEND_DATA_DIR: sled data directory
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("ATTEND_STORAGE")
                .ok()
                .and_then(|s| StorageBackend::from_str(&s))
                .unwrap_or(defaults.backend),
            data_dir: env::var("ATTEND_DATA_DIR").unwrap_or(defaults.data_dir),
        }
    }

    /// Test configuration (memory)
    pub fn test() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!(StorageBackend::from_str("SLED"), Some(StorageBackend::Sled));
        assert_eq!(StorageBackend::from_str("mem"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::from_str("postgres"), None);
    }

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(StorageConfig::test().backend, StorageBackend::Memory);
    }
}
