//! Ledger entry statuses, tagged target ids, and error-message
//! sanitization (MIG-07).
//!
//! The ledger is the durable (run, entity_type, source_id) → outcome
//! map. Virtual entities (shipping/payment methods) have no real
//! remote-resource id in the destination; their target id is a
//! synthetic hash key tagged so downstream consumers cannot mistake it
//! for a remote id.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entity::EntityType;

/// Maximum persisted length of a ledger error message, in characters.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

/// Storage prefix distinguishing synthetic target ids from remote ones.
pub const SYNTHETIC_PREFIX: &str = "virtual:";

/// Hex digits kept from the hash when building a synthetic key.
const SYNTHETIC_KEY_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Entry Status
// ---------------------------------------------------------------------------

/// Status of one ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl EntryStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] =
        &["pending", "running", "success", "failed", "skipped"];
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Target Id
// ---------------------------------------------------------------------------

/// A migrated record's destination identifier.
///
/// Either a real remote-resource id returned by the destination API,
/// or an opaque synthetic key for entity kinds stored only as
/// metadata. The string encoding prefixes synthetic keys with
/// [`SYNTHETIC_PREFIX`] so the distinction survives the database
/// round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum TargetId {
    /// A real destination resource id (usable in API paths and
    /// reference fields).
    Remote(String),
    /// An opaque synthetic key; never a valid remote-resource id.
    Synthetic(String),
}

impl TargetId {
    /// Encode for storage in the ledger's `target_id` column.
    pub fn encode(&self) -> String {
        match self {
            Self::Remote(id) => id.clone(),
            Self::Synthetic(key) => format!("{SYNTHETIC_PREFIX}{key}"),
        }
    }

    /// Decode a stored `target_id` column value.
    pub fn decode(raw: &str) -> Self {
        match raw.strip_prefix(SYNTHETIC_PREFIX) {
            Some(key) => Self::Synthetic(key.to_string()),
            None => Self::Remote(raw.to_string()),
        }
    }

    /// The remote resource id, if this is a real one.
    pub fn as_remote(&self) -> Option<&str> {
        match self {
            Self::Remote(id) => Some(id),
            Self::Synthetic(_) => None,
        }
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Build the synthetic target key for a virtual entity, derived from
/// its entity type and name. Stable across runs.
pub fn synthetic_key(entity_type: EntityType, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entity_type.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..SYNTHETIC_KEY_LENGTH].to_string()
}

// ---------------------------------------------------------------------------
// Error sanitization
// ---------------------------------------------------------------------------

/// Truncate an error message to [`MAX_ERROR_MESSAGE_LENGTH`]
/// characters before persisting, stripping control characters that
/// would garble log output.
pub fn truncate_error(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .map(|c| if c.is_control() && c != '\n' { ' ' } else { c })
        .collect();
    if cleaned.chars().count() <= MAX_ERROR_MESSAGE_LENGTH {
        return cleaned;
    }
    let truncated: String = cleaned.chars().take(MAX_ERROR_MESSAGE_LENGTH - 1).collect();
    format!("{truncated}…")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
