//! Command handlers for the CLI

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;

use attend_api::{run_server, ApiConfig};
use attend_core::{
    classify, codec, minutes_late, parse_time_of_day, ExpiryPolicy, ParticipantSecret,
};
use attend_store::StorageBackend;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Flags that override the environment configuration of `serve`
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub storage: Option<String>,
    pub data_dir: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub max_age_days: Option<u32>,
}

/// Environment configuration with command line overrides applied
pub fn serve_config(overrides: ServeOverrides) -> CmdResult<ApiConfig> {
    let mut config = ApiConfig::from_env();

    if let Some(host) = overrides.host {
        config.host = host;
    }
    if let Some(port) = overrides.port {
        config.port = port;
    }
    if let Some(storage) = overrides.storage {
        config.storage.backend = StorageBackend::from_str(&storage)
            .ok_or_else(|| format!("unknown storage backend: {}", storage))?;
    }
    if let Some(data_dir) = overrides.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(minutes) = overrides.utc_offset_minutes {
        config.policy = config.policy.with_utc_offset_minutes(minutes);
    }
    if let Some(days) = overrides.max_age_days {
        config.policy = config.policy.with_expiry(ExpiryPolicy::enforced(days));
    }

    Ok(config)
}

/// Start the API server
pub async fn handle_serve(overrides: ServeOverrides) -> CmdResult {
    let config = serve_config(overrides)?;
    println!(
        "Starting attend API server on {}:{} ({:?} storage)...",
        config.host, config.port, config.storage.backend
    );
    run_server(config).await
}

pub fn generate_secret() -> String {
    ParticipantSecret::generate().to_hex()
}

fn parse_secret(secret_hex: &str) -> CmdResult<ParticipantSecret> {
    let secret = ParticipantSecret::from_hex(secret_hex.trim())
        .map_err(|e| format!("invalid secret hex: {}", e))?;
    if secret.is_empty() {
        return Err("secret must not be empty".into());
    }
    Ok(secret)
}

/// Serialized payload for a participant
pub fn issue_payload(external_id: &str, secret_hex: &str, timestamp: Option<i64>) -> CmdResult<String> {
    let secret = parse_secret(secret_hex)?;
    let payload = match timestamp {
        Some(ts) => codec::issue_at(external_id, &secret, ts),
        None => codec::issue(external_id, &secret),
    };
    Ok(codec::serialize(&payload))
}

/// Result of an offline payload check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid { external_id: String, issued_at: i64 },
    Malformed(String),
    InvalidSignature,
    Expired { issued_at: i64 },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid {
                external_id,
                issued_at,
            } => write!(f, "valid: {} (issued at {})", external_id, issued_at),
            Self::Malformed(reason) => write!(f, "malformed: {}", reason),
            Self::InvalidSignature => write!(f, "invalid signature"),
            Self::Expired { issued_at } => write!(f, "expired (issued at {})", issued_at),
        }
    }
}

/// Verify a payload offline with the participant's secret
pub fn verify_payload(raw: &str, secret_hex: &str, max_age_days: Option<u32>) -> CmdResult<Verdict> {
    verify_payload_at(raw, secret_hex, max_age_days, Utc::now().timestamp())
}

pub fn verify_payload_at(
    raw: &str,
    secret_hex: &str,
    max_age_days: Option<u32>,
    now: i64,
) -> CmdResult<Verdict> {
    let secret = parse_secret(secret_hex)?;
    let payload = match codec::deserialize(raw) {
        Ok(payload) => payload,
        Err(e) => return Ok(Verdict::Malformed(e.to_string())),
    };

    if !codec::verify(&payload, &secret) {
        return Ok(Verdict::InvalidSignature);
    }
    if let Some(days) = max_age_days {
        if codec::is_expired_at(&payload, days, now) {
            return Ok(Verdict::Expired {
                issued_at: payload.issued_at,
            });
        }
    }

    Ok(Verdict::Valid {
        external_id: payload.participant_external_id,
        issued_at: payload.issued_at,
    })
}

/// Classification line for an arrival
pub fn classify_arrival(start: &str, grace: u32, at: Option<&str>) -> CmdResult<String> {
    let start_time =
        parse_time_of_day(start).ok_or_else(|| format!("invalid start time: {}", start))?;
    let arrival: DateTime<FixedOffset> = match at {
        Some(at) => DateTime::parse_from_rfc3339(at)
            .map_err(|e| format!("invalid arrival time {}: {}", at, e))?,
        None => Utc::now().fixed_offset(),
    };

    let status = classify(&arrival, start_time, grace);
    let late_by = minutes_late(&arrival, start_time);
    Ok(format!(
        "{} ({} min after {}, grace {} min)",
        status,
        late_by,
        start_time.format("%H:%M"),
        grace
    ))
}

/// Submit a scan to a running server
pub async fn handle_scan(
    api_url: &str,
    activity_id: &str,
    payload: &str,
    station_id: Option<String>,
) -> CmdResult {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/v1/scans", api_url))
        .json(&serde_json::json!({
            "payload": payload,
            "activity_id": activity_id,
            "station_id": station_id,
        }))
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;

    match response.get("message").and_then(|m| m.as_str()) {
        Some(message) => println!("{}", message),
        None => println!("{}", serde_json::to_string_pretty(&response)?),
    }
    Ok(())
}

/// Show server status
pub async fn handle_status(api_url: &str) -> CmdResult {
    println!("Checking attend server status at {}...", api_url);

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", api_url))
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;

    println!("Status: {}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
