//! Run lifecycle enums and pure lifecycle validation (MIG-04).
//!
//! This module has zero external dependencies (no DB, no async, no
//! I/O). Status transitions are monotonic except for the
//! pending/running/paused loop; `completed` and `failed` are terminal.

use serde::{Deserialize, Serialize};

/// Maximum length of a run name.
pub const MAX_RUN_NAME_LENGTH: usize = 128;

// ---------------------------------------------------------------------------
// Run Status
// ---------------------------------------------------------------------------

/// Status of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl RunStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] =
        &["pending", "running", "paused", "completed", "failed"];

    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a run may move from `from` to `to`.
///
/// The lifecycle is monotonic except for the pending/running/paused
/// loop. Any non-terminal status may fail (explicit cancellation maps
/// to `Failed`); only `Running` may complete.
pub fn can_transition(from: RunStatus, to: RunStatus) -> bool {
    use RunStatus::*;
    match (from, to) {
        (Pending, Running) => true,
        (Running, Paused) | (Paused, Running) => true,
        (Running, Pending) | (Paused, Pending) => true,
        (Running, Completed) => true,
        (Pending, Failed) | (Running, Failed) | (Paused, Failed) => true,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Sync Mode
// ---------------------------------------------------------------------------

/// Whether a run migrates everything or only records changed since the
/// last recorded sync point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Delta,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Delta => "delta",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "delta" => Some(Self::Delta),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["full", "delta"];
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Conflict Strategy
// ---------------------------------------------------------------------------

/// How delta-mode update conflicts are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    SourceWins,
    DestinationWins,
    Manual,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceWins => "source_wins",
            Self::DestinationWins => "destination_wins",
            Self::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "source_wins" => Some(Self::SourceWins),
            "destination_wins" => Some(Self::DestinationWins),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["source_wins", "destination_wins", "manual"];
}

impl std::fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a run name.
pub fn validate_run_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Run name cannot be empty".to_string());
    }
    if name.len() > MAX_RUN_NAME_LENGTH {
        return Err(format!(
            "Run name exceeds maximum length of {MAX_RUN_NAME_LENGTH} characters"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
