//! Error types for Attend Core
//!
//! Scan rejections (bad QR, unknown participant, duplicate scan) are not
//! errors: they are [`crate::ScanOutcome`] variants. Only faults of the
//! storage collaborators surface through these types.

use thiserror::Error;

/// Storage collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    /// A conditional write lost against an existing value for the same key
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Attendance engine errors
#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The store broke one of its own contracts (e.g. reported a conflict
    /// for a key that then has no record)
    #[error("Inconsistent store state: {0}")]
    Inconsistent(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for engine operations
pub type AttendanceResult<T> = Result<T, AttendanceError>;
