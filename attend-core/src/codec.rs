//! QR Payload Signature Codec
//!
//! A QR payload is self-certifying: it carries the participant's external
//! ID, the issue time and a keyed digest over both. Only the server knows
//! the participant secret, so a scanner can authenticate a code without
//! any lookup at issuance time.
//!
//! Signature: `hex(SHA-256(external_id || ":" || issued_at || ":" || secret_hex))`
//!
//! `secret_hex` is the secret's lowercase hex text, the form enrollment
//! stores and hands out, so codes printed from a stored secret verify
//! against that same secret.
//!
//! Wire format (JSON, exactly three fields):
//!
//! ```text
//! {"studentId":"12345","timestamp":1767225600,"hash":"<64 lowercase hex>"}
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::types::ParticipantSecret;

/// Seconds in one day, used for expiry arithmetic
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Signed QR payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QrPayload {
    /// Participant external identifier (e.g. student number)
    #[serde(rename = "studentId")]
    pub participant_external_id: String,
    /// Issue time in epoch seconds
    #[serde(rename = "timestamp")]
    pub issued_at: i64,
    /// Lowercase hex SHA-256 signature
    #[serde(rename = "hash")]
    pub signature: String,
}

/// Raw scan text that is not a QR payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed QR payload: {reason}")]
pub struct MalformedPayload {
    pub reason: String,
}

/// Compute the payload signature as lowercase hex
pub fn compute_signature(
    participant_external_id: &str,
    issued_at: i64,
    secret: &ParticipantSecret,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(participant_external_id.as_bytes());
    hasher.update(b":");
    hasher.update(issued_at.to_string().as_bytes());
    hasher.update(b":");
    let secret_hex = Zeroizing::new(secret.to_hex());
    hasher.update(secret_hex.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issue a payload stamped with the current epoch second
pub fn issue(participant_external_id: &str, secret: &ParticipantSecret) -> QrPayload {
    issue_at(participant_external_id, secret, Utc::now().timestamp())
}

/// Issue a payload with an explicit issue time
pub fn issue_at(participant_external_id: &str, secret: &ParticipantSecret, issued_at: i64) -> QrPayload {
    QrPayload {
        participant_external_id: participant_external_id.to_string(),
        issued_at,
        signature: compute_signature(participant_external_id, issued_at, secret),
    }
}

/// Encode a payload for embedding in a QR code
pub fn serialize(payload: &QrPayload) -> String {
    // A struct of two strings and an integer always serializes
    serde_json::to_string(payload).unwrap_or_default()
}

/// Decode scanned text. Camera noise and foreign QR codes are expected,
/// so this only ever returns `Err`, never panics.
pub fn deserialize(raw: &str) -> Result<QrPayload, MalformedPayload> {
    serde_json::from_str(raw.trim()).map_err(|e| MalformedPayload {
        reason: e.to_string(),
    })
}

/// Check a payload's signature against the participant secret
///
/// The recomputed hex digest is compared to the presented one in constant
/// time over the full length.
pub fn verify(payload: &QrPayload, secret: &ParticipantSecret) -> bool {
    let expected = compute_signature(&payload.participant_external_id, payload.issued_at, secret);
    expected.as_bytes().ct_eq(payload.signature.as_bytes()).into()
}

/// True if the payload is older than `max_age_days` right now
pub fn is_expired(payload: &QrPayload, max_age_days: u32) -> bool {
    is_expired_at(payload, max_age_days, Utc::now().timestamp())
}

/// True iff `now - issued_at > max_age_days * 86400`
pub fn is_expired_at(payload: &QrPayload, max_age_days: u32, now: i64) -> bool {
    let age = now.saturating_sub(payload.issued_at);
    age > i64::from(max_age_days) * SECONDS_PER_DAY
}
