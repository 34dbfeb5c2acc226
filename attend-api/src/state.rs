//! Application state for the API server

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use attend_core::{ScanDebouncer, ScanPolicy, ScanResolver, StoreResult, DEFAULT_COOLDOWN};
use attend_store::{AttendanceStore, MemoryStore, SledStore, StorageBackend, StorageConfig};

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Enrollment, catalog and record storage
    pub store: Arc<dyn AttendanceStore>,
    /// Scan resolver over the same store
    pub resolver: ScanResolver,
    /// Repeat-read suppression per scanning station
    pub debouncer: Arc<ScanDebouncer>,
    /// Token required for administrative deletes; `None` disables them
    pub admin_token: Option<Arc<str>>,
    /// API version
    pub version: String,
}

impl AppState {
    /// Build state around a store
    pub fn new<S>(store: Arc<S>, config: &ApiConfig) -> Self
    where
        S: AttendanceStore + 'static,
    {
        let resolver = ScanResolver::from_store(store.clone()).with_policy(config.policy);

        Self {
            store,
            resolver,
            debouncer: Arc::new(ScanDebouncer::new(config.debounce_cooldown)),
            admin_token: config.admin_token.as_deref().map(Arc::from),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Open the configured storage backend and build state around it
    pub fn from_config(config: &ApiConfig) -> StoreResult<Self> {
        match config.storage.backend {
            StorageBackend::Memory => Ok(Self::new(Arc::new(MemoryStore::new()), config)),
            StorageBackend::Sled => {
                let store = SledStore::new(&config.storage)?;
                Ok(Self::new(Arc::new(store), config))
            }
        }
    }
}

/// API server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub admin_token: Option<String>,
    pub storage: StorageConfig,
    pub policy: ScanPolicy,
    pub debounce_cooldown: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            admin_token: None,
            storage: StorageConfig::default(),
            policy: ScanPolicy::default(),
            debounce_cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("enable_cors", &self.enable_cors)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .field("storage", &self.storage)
            .field("policy", &self.policy)
            .field("debounce_cooldown", &self.debounce_cooldown)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - ATTEND_HOST, ATTEND_PORT: listen address
    /// - ATTEND_CORS: `true`/`false`
    /// - ATTEND_ADMIN_TOKEN: enables administrative record deletion
    /// - ATTEND_DEBOUNCE_MS: repeat-read cooldown per station
    /// - plus the storage and scan policy variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("ATTEND_HOST").unwrap_or(defaults.host),
            port: env::var("ATTEND_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            enable_cors: env::var("ATTEND_CORS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enable_cors),
            admin_token: env::var("ATTEND_ADMIN_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
            storage: StorageConfig::from_env(),
            policy: ScanPolicy::from_env(),
            debounce_cooldown: env::var("ATTEND_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce_cooldown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_admin_token() {
        let config = ApiConfig {
            admin_token: Some("hunter2".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_state_from_memory_config() {
        let config = ApiConfig {
            admin_token: Some("token".to_string()),
            ..Default::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.admin_token.as_deref(), Some("token"));
        assert_eq!(state.debouncer.cooldown(), DEFAULT_COOLDOWN);
    }
}
