//! Participant secret material

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use super::ParticipantId;

/// Secret size in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;

/// Per-participant signing secret that zeroizes on drop
///
/// Bound 1:1 to a participant at enrollment and never changed afterwards.
/// Serialized as lowercase hex so stores can persist it, and that hex text
/// is what the payload signature covers. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ParticipantSecret(Vec<u8>);

impl ParticipantSecret {
    /// Generate a new random secret from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for ParticipantSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for ParticipantSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParticipantSecret([REDACTED {} bytes])", self.0.len())
    }
}

impl Serialize for ParticipantSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ParticipantSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// What the engine needs to know about a participant to check a scan
#[derive(Debug, Clone)]
pub struct ParticipantCredentials {
    pub participant_id: ParticipantId,
    pub secret: ParticipantSecret,
}
