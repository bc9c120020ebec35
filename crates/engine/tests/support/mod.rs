//! In-memory collaborator fakes for engine tests.
//!
//! Each fake implements the matching collaborator trait over plain
//! mutex-guarded maps, mirroring the upsert semantics of the Postgres
//! implementations closely enough to exercise the orchestration paths
//! without a database or network.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use storebridge_core::audit::Severity;
use storebridge_core::entity::EntityType;
use storebridge_core::ledger::{truncate_error, EntryStatus, TargetId};
use storebridge_core::run::{ConflictStrategy, RunStatus, SyncMode};
use storebridge_core::types::{DbId, Timestamp};
use storebridge_engine::{
    AuditSink, CancelFlags, DestinationClient, Engine, EngineError, EntityRegistry, Ledger,
    LedgerState, PipelineOptions, ResolvedRefs, RunState, RunStore, SourceReader, SourceRecord,
    Stores, Transformer,
};

pub const RUN_ID: DbId = 1;

pub fn ts(secs: i64) -> Timestamp {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn running_run(sync_mode: SyncMode, conflict_strategy: ConflictStrategy) -> RunState {
    RunState {
        id: RUN_ID,
        name: "test run".to_string(),
        is_dry_run: false,
        sync_mode,
        conflict_strategy,
        status: RunStatus::Running,
        last_sync_at: None,
    }
}

pub fn fast_options() -> PipelineOptions {
    PipelineOptions {
        batch_parallelism: 2,
        batch_max_attempts: 3,
        batch_retry_delay: Duration::from_millis(1),
        include_cms_pages: false,
    }
}

// ---------------------------------------------------------------------------
// Run store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRunStore {
    runs: Mutex<HashMap<DbId, RunState>>,
    queued: Mutex<HashSet<DbId>>,
    errors: Mutex<HashMap<DbId, String>>,
}

impl MemoryRunStore {
    pub fn with_run(run: RunState) -> Arc<Self> {
        let store = Self::default();
        store.runs.lock().unwrap().insert(run.id, run);
        Arc::new(store)
    }

    pub fn status(&self, run_id: DbId) -> RunStatus {
        self.runs.lock().unwrap()[&run_id].status
    }

    pub fn set_status(&self, run_id: DbId, status: RunStatus) {
        self.runs.lock().unwrap().get_mut(&run_id).unwrap().status = status;
    }

    pub fn last_sync_at(&self, run_id: DbId) -> Option<Timestamp> {
        self.runs.lock().unwrap()[&run_id].last_sync_at
    }

    pub fn last_error(&self, run_id: DbId) -> Option<String> {
        self.errors.lock().unwrap().get(&run_id).cloned()
    }

    pub fn is_queued(&self, run_id: DbId) -> bool {
        self.queued.lock().unwrap().contains(&run_id)
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn get(&self, run_id: DbId) -> Result<RunState, EngineError> {
        self.runs
            .lock()
            .unwrap()
            .get(&run_id)
            .cloned()
            .ok_or(EngineError::RunNotFound(run_id))
    }

    async fn try_transition(
        &self,
        run_id: DbId,
        from: RunStatus,
        to: RunStatus,
    ) -> Result<bool, EngineError> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs.get_mut(&run_id).ok_or(EngineError::RunNotFound(run_id))?;
        if run.status == from {
            run.status = to;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn enqueue(&self, run_id: DbId) -> Result<bool, EngineError> {
        let runs = self.runs.lock().unwrap();
        let run = runs.get(&run_id).ok_or(EngineError::RunNotFound(run_id))?;
        if run.status == RunStatus::Pending {
            self.queued.lock().unwrap().insert(run_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn advance_last_sync(
        &self,
        run_id: DbId,
        captured_at: Timestamp,
    ) -> Result<(), EngineError> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs.get_mut(&run_id).ok_or(EngineError::RunNotFound(run_id))?;
        run.last_sync_at = Some(match run.last_sync_at {
            Some(current) if current > captured_at => current,
            _ => captured_at,
        });
        Ok(())
    }

    async fn complete(&self, run_id: DbId) -> Result<bool, EngineError> {
        self.try_transition(run_id, RunStatus::Running, RunStatus::Completed)
            .await
    }

    async fn finish(
        &self,
        run_id: DbId,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), EngineError> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs.get_mut(&run_id).ok_or(EngineError::RunNotFound(run_id))?;
        if run.status != status {
            run.status = status;
            if let Some(error) = error {
                self.errors
                    .lock()
                    .unwrap()
                    .insert(run_id, error.to_string());
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LedgerRow {
    pub status: Option<EntryStatus>,
    pub target: Option<TargetId>,
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
    pub last_synced_at: Option<Timestamp>,
    pub sync_status: Option<String>,
}

#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<HashMap<(DbId, EntityType, String), LedgerRow>>,
    /// Source ids whose `mark_running` fails, simulating a store-level
    /// fault inside a batch attempt.
    pub fail_mark_running: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn row(&self, run_id: DbId, entity_type: EntityType, source_id: &str) -> Option<LedgerRow> {
        self.rows
            .lock()
            .unwrap()
            .get(&(run_id, entity_type, source_id.to_string()))
            .cloned()
    }

    pub fn status(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Option<EntryStatus> {
        self.row(run_id, entity_type, source_id).and_then(|r| r.status)
    }

    pub fn count_with_status(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        status: EntryStatus,
    ) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((r, et, _), row)| {
                *r == run_id && *et == entity_type && row.status == Some(status)
            })
            .count()
    }

    pub fn seed_success(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        target: TargetId,
        last_synced_at: Option<Timestamp>,
    ) {
        self.rows.lock().unwrap().insert(
            (run_id, entity_type, source_id.to_string()),
            LedgerRow {
                status: Some(EntryStatus::Success),
                target: Some(target),
                payload: None,
                error: None,
                last_synced_at,
                sync_status: Some("synced".to_string()),
            },
        );
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn already_migrated(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<bool, EngineError> {
        Ok(self.status(run_id, entity_type, source_id) == Some(EntryStatus::Success))
    }

    async fn target_of(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<TargetId>, EngineError> {
        Ok(self
            .row(run_id, entity_type, source_id)
            .filter(|r| r.status == Some(EntryStatus::Success))
            .and_then(|r| r.target))
    }

    async fn state_of(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<LedgerState>, EngineError> {
        Ok(self.row(run_id, entity_type, source_id).map(|r| LedgerState {
            status: r.status.unwrap_or(EntryStatus::Pending),
            target_id: r.target,
            last_synced_at: r.last_synced_at,
        }))
    }

    async fn mark_pending(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap();
        for id in source_ids {
            let row = rows
                .entry((run_id, entity_type, id.clone()))
                .or_default();
            if row.status != Some(EntryStatus::Success) {
                row.status = Some(EntryStatus::Pending);
                row.error = None;
            }
        }
        Ok(())
    }

    async fn reset_pending(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap();
        for id in source_ids {
            let row = rows
                .entry((run_id, entity_type, id.clone()))
                .or_default();
            row.status = Some(EntryStatus::Pending);
            row.error = None;
        }
        Ok(())
    }

    async fn mark_running(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), EngineError> {
        if self.fail_mark_running.lock().unwrap().contains(source_id) {
            return Err(EngineError::Store("injected ledger failure".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .entry((run_id, entity_type, source_id.to_string()))
            .or_default();
        row.status = Some(EntryStatus::Running);
        Ok(())
    }

    async fn set_success(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        target: &TargetId,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .entry((run_id, entity_type, source_id.to_string()))
            .or_default();
        row.status = Some(EntryStatus::Success);
        row.target = Some(target.clone());
        if payload.is_some() {
            row.payload = payload.cloned();
        }
        row.error = None;
        row.last_synced_at = Some(Utc::now());
        row.sync_status = Some("synced".to_string());
        Ok(())
    }

    async fn mark_failed(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        error: &str,
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .entry((run_id, entity_type, source_id.to_string()))
            .or_default();
        row.status = Some(EntryStatus::Failed);
        row.error = Some(truncate_error(error));
        Ok(())
    }

    async fn mark_skipped(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .entry((run_id, entity_type, source_id.to_string()))
            .or_default();
        row.status = Some(EntryStatus::Skipped);
        if payload.is_some() {
            row.payload = payload.cloned();
        }
        Ok(())
    }

    async fn flag_conflict(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.get_mut(&(run_id, entity_type, source_id.to_string())) {
            row.sync_status = Some("conflict".to_string());
        }
        Ok(())
    }

    async fn target_map(
        &self,
        run_id: DbId,
        entity_type: EntityType,
    ) -> Result<HashMap<String, TargetId>, EngineError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((r, et, _), row)| {
                *r == run_id && *et == entity_type && row.status == Some(EntryStatus::Success)
            })
            .filter_map(|((_, _, id), row)| row.target.clone().map(|t| (id.clone(), t)))
            .collect())
    }

    async fn state_map(
        &self,
        run_id: DbId,
        entity_type: EntityType,
    ) -> Result<HashMap<String, LedgerState>, EngineError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((r, et, _), _)| *r == run_id && *et == entity_type)
            .map(|((_, _, id), row)| {
                (
                    id.clone(),
                    LedgerState {
                        status: row.status.unwrap_or(EntryStatus::Pending),
                        target_id: row.target.clone(),
                        last_synced_at: row.last_synced_at,
                    },
                )
            })
            .collect())
    }

    async fn fail_remaining(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
        error: &str,
    ) -> Result<u64, EngineError> {
        let mut rows = self.rows.lock().unwrap();
        let mut swept = 0;
        for id in source_ids {
            if let Some(row) = rows.get_mut(&(run_id, entity_type, id.clone())) {
                if matches!(
                    row.status,
                    Some(EntryStatus::Pending) | Some(EntryStatus::Running)
                ) {
                    row.status = Some(EntryStatus::Failed);
                    row.error = Some(truncate_error(error));
                    swept += 1;
                }
            }
        }
        Ok(swept)
    }

    async fn status_counts(
        &self,
        run_id: DbId,
    ) -> Result<Vec<storebridge_engine::StatusCount>, EngineError> {
        let mut grouped: BTreeMap<(String, String), i64> = BTreeMap::new();
        for ((r, et, _), row) in self.rows.lock().unwrap().iter() {
            if *r != run_id {
                continue;
            }
            if let Some(status) = row.status {
                *grouped
                    .entry((et.as_str().to_string(), status.as_str().to_string()))
                    .or_default() += 1;
            }
        }
        Ok(grouped
            .into_iter()
            .map(
                |((entity_type, status), count)| storebridge_engine::StatusCount {
                    entity_type,
                    status,
                    count,
                },
            )
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Cancellation flags and audit sink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryFlags {
    raised: Mutex<HashSet<DbId>>,
}

impl MemoryFlags {
    pub fn raise_now(&self, run_id: DbId) {
        self.raised.lock().unwrap().insert(run_id);
    }

    pub fn is_raised_now(&self, run_id: DbId) -> bool {
        self.raised.lock().unwrap().contains(&run_id)
    }
}

#[async_trait]
impl CancelFlags for MemoryFlags {
    async fn raise(&self, run_id: DbId) -> Result<(), EngineError> {
        self.raise_now(run_id);
        Ok(())
    }

    async fn is_raised(&self, run_id: DbId) -> Result<bool, EngineError> {
        Ok(self.is_raised_now(run_id))
    }

    async fn clear(&self, run_id: DbId) -> Result<(), EngineError> {
        self.raised.lock().unwrap().remove(&run_id);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AuditLine {
    pub run_id: DbId,
    pub entity_type: Option<EntityType>,
    pub source_id: Option<String>,
    pub severity: Severity,
    pub message: String,
}

#[derive(Default)]
pub struct MemoryAudit {
    pub lines: Mutex<Vec<AuditLine>>,
}

impl MemoryAudit {
    pub fn messages(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.message.clone())
            .collect()
    }

    pub fn count_with_severity(&self, severity: Severity) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.severity == severity)
            .count()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.messages().iter().any(|m| m.contains(fragment))
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record(
        &self,
        run_id: DbId,
        entity_type: Option<EntityType>,
        source_id: Option<&str>,
        severity: Severity,
        message: &str,
    ) -> Result<(), EngineError> {
        self.lines.lock().unwrap().push(AuditLine {
            run_id,
            entity_type,
            source_id: source_id.map(str::to_string),
            severity,
            message: message.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source reader and transformers
// ---------------------------------------------------------------------------

/// Reader over scripted record lists.
#[derive(Default)]
pub struct ScriptedReader {
    pub records: HashMap<EntityType, Vec<SourceRecord>>,
    pub children: HashMap<String, Vec<SourceRecord>>,
    /// Return everything from `fetch_updated_since`, simulating a
    /// source whose change filter is coarser than the sync point.
    pub coarse_delta: bool,
}

impl ScriptedReader {
    pub fn add(&mut self, entity_type: EntityType, record: SourceRecord) -> &mut Self {
        self.records.entry(entity_type).or_default().push(record);
        self
    }

    pub fn add_child(&mut self, parent_id: &str, record: SourceRecord) -> &mut Self {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(record);
        self
    }
}

#[async_trait]
impl SourceReader for ScriptedReader {
    async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<SourceRecord>, EngineError> {
        Ok(self.records.get(&entity_type).cloned().unwrap_or_default())
    }

    async fn fetch_updated_since(
        &self,
        entity_type: EntityType,
        since: Timestamp,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        let all = self.fetch_all(entity_type).await?;
        if self.coarse_delta {
            return Ok(all);
        }
        Ok(all
            .into_iter()
            .filter(|r| r.updated_at.map_or(true, |u| u > since))
            .collect())
    }

    async fn fetch_by_id(
        &self,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<SourceRecord>, EngineError> {
        Ok(self
            .records
            .get(&entity_type)
            .and_then(|list| list.iter().find(|r| r.source_id == source_id))
            .cloned())
    }

    async fn fetch_children(
        &self,
        _entity_type: EntityType,
        parent_id: &str,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        Ok(self.children.get(parent_id).cloned().unwrap_or_default())
    }
}

/// Reader whose bulk fetches always fail, for stage-failure tests.
pub struct BrokenReader;

#[async_trait]
impl SourceReader for BrokenReader {
    async fn fetch_all(&self, _: EntityType) -> Result<Vec<SourceRecord>, EngineError> {
        Err(EngineError::Source("source connection lost".to_string()))
    }

    async fn fetch_updated_since(
        &self,
        _: EntityType,
        _: Timestamp,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        Err(EngineError::Source("source connection lost".to_string()))
    }

    async fn fetch_by_id(
        &self,
        _: EntityType,
        _: &str,
    ) -> Result<Option<SourceRecord>, EngineError> {
        Err(EngineError::Source("source connection lost".to_string()))
    }
}

/// Copies the record data and folds resolved references in as encoded
/// target-id strings.
pub struct RefTransformer;

impl Transformer for RefTransformer {
    fn transform(
        &self,
        record: &SourceRecord,
        refs: &ResolvedRefs,
    ) -> Result<serde_json::Value, EngineError> {
        let mut payload = record.data.clone();
        if let Some(obj) = payload.as_object_mut() {
            for (field, target) in refs {
                obj.insert(field.clone(), serde_json::Value::String(target.encode()));
            }
        }
        Ok(payload)
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

pub type CreateHook = Box<dyn Fn(usize) + Send + Sync>;

/// Destination fake that records every write and can fail selected
/// creates, report modification timestamps, and fire a hook after each
/// create (used to raise flags or pause runs mid-stage).
#[derive(Default)]
pub struct RecordingDestination {
    pub created: Mutex<Vec<(String, String)>>,
    pub updated: Mutex<Vec<(String, String)>>,
    pub remote_modified: Mutex<HashMap<String, Timestamp>>,
    pub modified_calls: AtomicU32,
    fail_lookup_values: Mutex<HashSet<String>>,
    by_lookup: Mutex<HashMap<String, String>>,
    next_id: AtomicU64,
    on_create: Mutex<Option<CreateHook>>,
    outage: AtomicBool,
    gone_ids: Mutex<HashSet<String>>,
}

impl RecordingDestination {
    pub fn fail_for(&self, lookup_value: &str) {
        self.fail_lookup_values
            .lock()
            .unwrap()
            .insert(lookup_value.to_string());
    }

    pub fn allow(&self, lookup_value: &str) {
        self.fail_lookup_values.lock().unwrap().remove(lookup_value);
    }

    /// Make every request fail as if the destination were unreachable.
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    /// Make updates against this remote id report the record as gone.
    pub fn mark_gone(&self, remote_id: &str) {
        self.gone_ids.lock().unwrap().insert(remote_id.to_string());
    }

    pub fn set_modified(&self, remote_id: &str, at: Timestamp) {
        self.remote_modified
            .lock()
            .unwrap()
            .insert(remote_id.to_string(), at);
    }

    pub fn set_on_create(&self, hook: CreateHook) {
        *self.on_create.lock().unwrap() = Some(hook);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn created_lookup_values(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn updated_ids(&self) -> Vec<String> {
        self.updated
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }
}

#[async_trait]
impl DestinationClient for RecordingDestination {
    async fn create_or_find(
        &self,
        resource: &str,
        _payload: &serde_json::Value,
        _lookup_key: &str,
        lookup_value: &str,
    ) -> Result<String, EngineError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(EngineError::DestinationUnavailable(
                "destination unreachable".to_string(),
            ));
        }
        if self
            .fail_lookup_values
            .lock()
            .unwrap()
            .contains(lookup_value)
        {
            return Err(EngineError::Destination(
                "simulated create failure".to_string(),
            ));
        }
        let id = self
            .by_lookup
            .lock()
            .unwrap()
            .entry(lookup_value.to_string())
            .or_insert_with(|| format!("dst-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
            .clone();
        let count = {
            let mut created = self.created.lock().unwrap();
            created.push((resource.to_string(), lookup_value.to_string()));
            created.len()
        };
        if let Some(hook) = self.on_create.lock().unwrap().as_ref() {
            hook(count);
        }
        Ok(id)
    }

    async fn update(
        &self,
        resource: &str,
        id: &str,
        _payload: &serde_json::Value,
    ) -> Result<(), EngineError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(EngineError::DestinationUnavailable(
                "destination unreachable".to_string(),
            ));
        }
        if self.gone_ids.lock().unwrap().contains(id) {
            return Err(EngineError::DestinationMissing(format!(
                "no such record {id}"
            )));
        }
        self.updated
            .lock()
            .unwrap()
            .push((resource.to_string(), id.to_string()));
        Ok(())
    }

    async fn modified_at(
        &self,
        _resource: &str,
        id: &str,
    ) -> Result<Option<Timestamp>, EngineError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(EngineError::DestinationUnavailable(
                "destination unreachable".to_string(),
            ));
        }
        self.modified_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.remote_modified.lock().unwrap().get(id).copied())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Wires all fakes into an [`Engine`] while keeping concrete handles
/// for assertions.
pub struct Harness {
    pub runs: Arc<MemoryRunStore>,
    pub ledger: Arc<MemoryLedger>,
    pub flags: Arc<MemoryFlags>,
    pub audit: Arc<MemoryAudit>,
    pub destination: Arc<RecordingDestination>,
}

impl Harness {
    pub fn new(run: RunState) -> Self {
        Self {
            runs: MemoryRunStore::with_run(run),
            ledger: Arc::new(MemoryLedger::default()),
            flags: Arc::new(MemoryFlags::default()),
            audit: Arc::new(MemoryAudit::default()),
            destination: Arc::new(RecordingDestination::default()),
        }
    }

    pub fn stores(&self) -> Stores {
        Stores {
            runs: self.runs.clone(),
            ledger: self.ledger.clone(),
            flags: self.flags.clone(),
            audit: self.audit.clone(),
        }
    }

    pub fn engine(&self, registry: EntityRegistry) -> Engine {
        Engine {
            stores: self.stores(),
            destination: self.destination.clone(),
            registry,
            options: fast_options(),
        }
    }
}
