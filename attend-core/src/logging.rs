//! Logging Standards and Conventions
//!
//! # Log Levels
//!
//! | Level | Usage | Examples |
//! |-------|-------|----------|
//! | ERROR | Storage faults, broken store contracts | Sled write failed |
//! | WARN  | Suspicious input | Forged or tampered QR signature |
//! | INFO  | Accepted state transitions | Arrival recorded, departure recorded |
//! | DEBUG | Routine rejections and decisions | Malformed QR, duplicate scan, debounce |
//! | TRACE | Scan receipt | Length of the raw scanned text, never its content |
//!
//! # Structured Logging Fields
//!
//! Always use structured fields for key information:
//!
//! ```ignore
//! use tracing::info;
//!
//! info!(
//!     operation = operations::ARRIVAL,
//!     participant_id = %record.participant_id,
//!     activity_id = %record.activity_id,
//!     status = %record.status,
//!     "Arrival recorded"
//! );
//! ```
//!
//! Never log participant secrets, signatures or raw scanned text.

use serde::{Deserialize, Serialize};

/// Log level enumeration matching tracing levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Default `EnvFilter` directive for the workspace crates at this level
    pub fn filter_directive(&self) -> String {
        let level = self.as_str();
        format!(
            "attend_core={level},attend_store={level},attend_api={level},attend_cli={level},tower_http={level}"
        )
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation names used in the `operation` field
pub mod operations {
    pub const SCAN: &str = "scan";
    pub const ARRIVAL: &str = "arrival";
    pub const DEPARTURE: &str = "departure";
    pub const VERIFY: &str = "verify";
    pub const ISSUE: &str = "issue";
    pub const DEBOUNCE: &str = "debounce";
    pub const ENROLL: &str = "enroll";
    pub const DELETE: &str = "delete";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("invalid"), None);
    }

    #[test]
    fn test_filter_directive() {
        let directive = LogLevel::Debug.filter_directive();
        assert!(directive.contains("attend_core=debug"));
        assert!(directive.contains("tower_http=debug"));
    }
}
