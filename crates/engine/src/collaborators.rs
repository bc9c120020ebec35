//! Collaborator traits the engine orchestrates (MIG-08).
//!
//! Each trait is the seam between orchestration logic and one
//! side-effecting backend: the source store, the transform layer, the
//! destination API, and the control-plane tables. Production
//! implementations live in [`crate::pg`]; tests substitute in-memory
//! fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use storebridge_core::audit::Severity;
use storebridge_core::entity::EntityType;
use storebridge_core::ledger::{EntryStatus, TargetId};
use storebridge_core::run::{ConflictStrategy, RunStatus, SyncMode};
use storebridge_core::types::{DbId, Timestamp};

use crate::error::EngineError;
use crate::record::{ResolvedRefs, SourceRecord};

/// The engine's view of a migration run row.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub id: DbId,
    pub name: String,
    pub is_dry_run: bool,
    pub sync_mode: SyncMode,
    pub conflict_strategy: ConflictStrategy,
    pub status: RunStatus,
    /// Delta high-water mark. `None` until the first stage settles.
    pub last_sync_at: Option<Timestamp>,
}

/// The engine's view of one ledger row.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub status: EntryStatus,
    pub target_id: Option<TargetId>,
    pub last_synced_at: Option<Timestamp>,
}

/// Per-(entity_type, status) ledger row count for one run.
#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub entity_type: String,
    pub status: String,
    pub count: i64,
}

/// Reads records from the source store.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Every record of one entity type.
    async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<SourceRecord>, EngineError>;

    /// Records modified after `since`. Records the source cannot
    /// timestamp must be included.
    async fn fetch_updated_since(
        &self,
        entity_type: EntityType,
        since: Timestamp,
    ) -> Result<Vec<SourceRecord>, EngineError>;

    /// One record by id. `None` when it no longer exists.
    async fn fetch_by_id(
        &self,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<SourceRecord>, EngineError>;

    /// Dependent sub-records processed inline with their parent
    /// (product variants and cross-sell links). Defaults to none.
    async fn fetch_children(
        &self,
        entity_type: EntityType,
        parent_id: &str,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        let _ = (entity_type, parent_id);
        Ok(Vec::new())
    }
}

/// Maps a source record plus its resolved references into the
/// destination payload shape. Pure; no I/O.
pub trait Transformer: Send + Sync {
    fn transform(
        &self,
        record: &SourceRecord,
        refs: &ResolvedRefs,
    ) -> Result<serde_json::Value, EngineError>;
}

/// Writes to the rate-limited destination REST API.
#[async_trait]
pub trait DestinationClient: Send + Sync {
    /// Idempotent create: at most one record per lookup value exists
    /// afterwards, and the returned id names it.
    async fn create_or_find(
        &self,
        resource: &str,
        payload: &serde_json::Value,
        lookup_key: &str,
        lookup_value: &str,
    ) -> Result<String, EngineError>;

    /// Update an existing destination record in place.
    async fn update(
        &self,
        resource: &str,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<(), EngineError>;

    /// The destination record's modification timestamp; `None` when
    /// the record does not exist.
    async fn modified_at(
        &self,
        resource: &str,
        id: &str,
    ) -> Result<Option<Timestamp>, EngineError>;
}

/// The run lifecycle store.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn get(&self, run_id: DbId) -> Result<RunState, EngineError>;

    /// Compare-and-set status transition. `false` means the run was
    /// not in `from`.
    async fn try_transition(
        &self,
        run_id: DbId,
        from: RunStatus,
        to: RunStatus,
    ) -> Result<bool, EngineError>;

    /// Queue a pending run for worker pickup. `false` when not
    /// pending.
    async fn enqueue(&self, run_id: DbId) -> Result<bool, EngineError>;

    /// Advance the delta high-water mark; never rewinds.
    async fn advance_last_sync(
        &self,
        run_id: DbId,
        captured_at: Timestamp,
    ) -> Result<(), EngineError>;

    /// Complete a still-running run. `false` when it moved elsewhere.
    async fn complete(&self, run_id: DbId) -> Result<bool, EngineError>;

    /// Move to a terminal status with an optional error. Idempotent.
    async fn finish(
        &self,
        run_id: DbId,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), EngineError>;
}

/// The per-run entity ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Idempotency gate: a `success` row exists for this record.
    async fn already_migrated(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<bool, EngineError>;

    /// Cross-reference lookup: the target id of a successfully
    /// migrated record, else `None`.
    async fn target_of(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<TargetId>, EngineError>;

    /// Full state of one row, any status.
    async fn state_of(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<LedgerState>, EngineError>;

    /// Upsert ids to `pending`, leaving `success` rows untouched.
    async fn mark_pending(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), EngineError>;

    /// Force ids back to `pending`, demoting stale `success` rows.
    /// Target ids survive so updates hit the existing destination
    /// record.
    async fn reset_pending(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), EngineError>;

    async fn mark_running(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), EngineError>;

    async fn set_success(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        target: &TargetId,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), EngineError>;

    /// Record a failure; the implementation bounds the message length.
    async fn mark_failed(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        error: &str,
    ) -> Result<(), EngineError>;

    async fn mark_skipped(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), EngineError>;

    /// Flag a row for manual conflict review.
    async fn flag_conflict(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), EngineError>;

    /// All `success` targets for one entity type, keyed by source id.
    async fn target_map(
        &self,
        run_id: DbId,
        entity_type: EntityType,
    ) -> Result<HashMap<String, TargetId>, EngineError>;

    /// All rows for one entity type, keyed by source id. Feeds the
    /// delta decision pass.
    async fn state_map(
        &self,
        run_id: DbId,
        entity_type: EntityType,
    ) -> Result<HashMap<String, LedgerState>, EngineError>;

    /// Sweep still-pending/running ids of an exhausted batch to
    /// `failed`. Returns the number of rows swept.
    async fn fail_remaining(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
        error: &str,
    ) -> Result<u64, EngineError>;

    async fn status_counts(&self, run_id: DbId) -> Result<Vec<StatusCount>, EngineError>;
}

/// The externalized, TTL'd per-run cancellation flag. Advisory and
/// polled; never a hard kill.
#[async_trait]
pub trait CancelFlags: Send + Sync {
    async fn raise(&self, run_id: DbId) -> Result<(), EngineError>;
    async fn is_raised(&self, run_id: DbId) -> Result<bool, EngineError>;
    async fn clear(&self, run_id: DbId) -> Result<(), EngineError>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        run_id: DbId,
        entity_type: Option<EntityType>,
        source_id: Option<&str>,
        severity: Severity,
        message: &str,
    ) -> Result<(), EngineError>;
}
