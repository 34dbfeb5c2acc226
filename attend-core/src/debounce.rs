//! Scan debouncing
//!
//! A camera keeps decoding the same code for as long as it is in view.
//! `ScanDebouncer` drops repeats of the same raw text from the same
//! scanning station within a cooldown window, before they reach the
//! resolver. The resolver stays correct without it; this only keeps
//! repeat reads out of the logs and off the store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::logging::operations;

/// Default cooldown between identical reads
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1500);

/// Entries kept before stale ones are swept
const SWEEP_THRESHOLD: usize = 1024;

/// Per-station duplicate read suppression
#[derive(Debug)]
pub struct ScanDebouncer {
    cooldown: Duration,
    last_seen: Mutex<HashMap<(String, String), Instant>>,
}

impl Default for ScanDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl ScanDebouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// True if this read should be processed, false if it is a repeat
    pub fn should_process(&self, station_id: &str, raw: &str) -> bool {
        self.should_process_at(station_id, raw, Instant::now())
    }

    /// Same as [`Self::should_process`] with an explicit instant
    ///
    /// A suppressed read does not extend the window: the cooldown always
    /// counts from the last accepted read.
    pub fn should_process_at(&self, station_id: &str, raw: &str, now: Instant) -> bool {
        let mut last_seen = match self.last_seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if last_seen.len() >= SWEEP_THRESHOLD {
            let cooldown = self.cooldown;
            last_seen.retain(|_, seen| now.saturating_duration_since(*seen) < cooldown);
        }

        let key = (station_id.to_string(), raw.to_string());
        if let Some(seen) = last_seen.get(&key) {
            if now.saturating_duration_since(*seen) < self.cooldown {
                debug!(
                    operation = operations::DEBOUNCE,
                    station_id = station_id,
                    "Suppressed repeat read"
                );
                return false;
            }
        }

        last_seen.insert(key, now);
        true
    }

    /// Drop the entry for a read that was let through but not resolved,
    /// so an immediate retry from the station is processed
    pub fn forget(&self, station_id: &str, raw: &str) {
        let mut last_seen = match self.last_seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        last_seen.remove(&(station_id.to_string(), raw.to_string()));
    }

    /// Number of tracked reads
    pub fn tracked(&self) -> usize {
        self.last_seen.lock().map(|m| m.len()).unwrap_or(0)
    }
}
