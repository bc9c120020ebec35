//! Delta and conflict decision functions (MIG-09).
//!
//! Pure functions over timestamps and sync mode. The destination read
//! that feeds [`evaluate_conflict`] happens in the engine; everything
//! here is testable with injected values.

use serde::{Deserialize, Serialize};

use crate::run::{ConflictStrategy, SyncMode};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Migration decision
// ---------------------------------------------------------------------------

/// The operation a selected record needs against the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationAction {
    Create,
    Update,
    CreateOrUpdate,
}

/// Why a record was selected or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    FullSync,
    FirstDeltaSync,
    NewRecord,
    NoSourceTimestamp,
    UpdatedSinceLastSync,
    NoChangesSinceLastSync,
}

/// Outcome of the per-record delta decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationDecision {
    pub should_migrate: bool,
    pub action: MigrationAction,
    pub reason: DecisionReason,
}

/// Decide whether a source record needs migrating in this run.
///
/// Rules, in order:
/// 1. Full sync migrates everything.
/// 2. Delta with no prior sync point migrates everything (first run).
/// 3. No ledger entry for this id: create (new record).
/// 4. Ledger entry but no source timestamp: update to be safe.
/// 5. Source changed after the sync point: update.
/// 6. Otherwise: skip.
pub fn should_migrate(
    sync_mode: SyncMode,
    last_sync_at: Option<Timestamp>,
    has_ledger_entry: bool,
    source_updated_at: Option<Timestamp>,
) -> MigrationDecision {
    if sync_mode == SyncMode::Full {
        return MigrationDecision {
            should_migrate: true,
            action: MigrationAction::CreateOrUpdate,
            reason: DecisionReason::FullSync,
        };
    }

    let Some(last_sync) = last_sync_at else {
        return MigrationDecision {
            should_migrate: true,
            action: MigrationAction::CreateOrUpdate,
            reason: DecisionReason::FirstDeltaSync,
        };
    };

    if !has_ledger_entry {
        return MigrationDecision {
            should_migrate: true,
            action: MigrationAction::Create,
            reason: DecisionReason::NewRecord,
        };
    }

    match source_updated_at {
        None => MigrationDecision {
            should_migrate: true,
            action: MigrationAction::Update,
            reason: DecisionReason::NoSourceTimestamp,
        },
        Some(updated) if updated > last_sync => MigrationDecision {
            should_migrate: true,
            action: MigrationAction::Update,
            reason: DecisionReason::UpdatedSinceLastSync,
        },
        Some(_) => MigrationDecision {
            should_migrate: false,
            action: MigrationAction::Update,
            reason: DecisionReason::NoChangesSinceLastSync,
        },
    }
}

// ---------------------------------------------------------------------------
// Conflict detection
// ---------------------------------------------------------------------------

/// Why a conflict check came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Both sides changed since the last sync.
    DestinationModified,
    /// The destination record no longer exists; re-create, no conflict.
    DestinationRecordNotFound,
    /// Destination unchanged since the last sync.
    DestinationUnchanged,
}

/// Outcome of comparing the destination record's modification time
/// against the ledger's last sync point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    pub reason: ConflictReason,
}

/// Evaluate whether the destination record changed behind our back.
///
/// `destination_modified` is `None` when the record is missing from
/// the destination; that is not a conflict, it means the record needs
/// re-creating.
pub fn evaluate_conflict(
    destination_modified: Option<Timestamp>,
    last_synced_at: Option<Timestamp>,
) -> ConflictCheck {
    match destination_modified {
        None => ConflictCheck {
            has_conflict: false,
            reason: ConflictReason::DestinationRecordNotFound,
        },
        Some(modified) => match last_synced_at {
            Some(last) if modified > last => ConflictCheck {
                has_conflict: true,
                reason: ConflictReason::DestinationModified,
            },
            // Never synced before but the record exists remotely: both
            // sides have state we did not write. Treat as modified.
            None => ConflictCheck {
                has_conflict: true,
                reason: ConflictReason::DestinationModified,
            },
            Some(_) => ConflictCheck {
                has_conflict: false,
                reason: ConflictReason::DestinationUnchanged,
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Conflict resolution
// ---------------------------------------------------------------------------

/// What to do with a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Overwrite the destination with the source state.
    Update,
    /// Leave the destination untouched.
    Skip,
    /// Leave the destination untouched and surface for manual review.
    Flag,
}

/// Map the run's conflict strategy to a resolution.
pub fn resolve_conflict(strategy: ConflictStrategy) -> ConflictResolution {
    match strategy {
        ConflictStrategy::SourceWins => ConflictResolution::Update,
        ConflictStrategy::DestinationWins => ConflictResolution::Skip,
        ConflictStrategy::Manual => ConflictResolution::Flag,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
