//! Postgres and Shopware implementations of the collaborator traits.
//!
//! Thin delegation layers: all SQL lives in the `storebridge-db`
//! repositories and all HTTP in `storebridge-shopware`; these adapters
//! only translate rows and errors into the engine's shapes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use storebridge_core::audit::Severity;
use storebridge_core::entity::EntityType;
use storebridge_core::ledger::{EntryStatus, TargetId};
use storebridge_core::run::{ConflictStrategy, RunStatus, SyncMode};
use storebridge_core::types::{DbId, Timestamp};
use storebridge_db::models::audit_entry::CreateAuditEntry;
use storebridge_db::models::ledger_entry::LedgerEntry;
use storebridge_db::models::migration_run::MigrationRun;
use storebridge_db::repositories::{AuditRepo, CancellationRepo, LedgerRepo, RunRepo};
use storebridge_shopware::{with_retry, RetryConfig, ShopwareApi};

use crate::collaborators::{
    AuditSink, CancelFlags, DestinationClient, Ledger, LedgerState, RunState, RunStore,
    StatusCount,
};
use crate::control::Stores;
use crate::error::EngineError;

impl Stores {
    /// Control-plane stores backed by Postgres.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            runs: Arc::new(PgRunStore::new(pool.clone())),
            ledger: Arc::new(PgLedger::new(pool.clone())),
            flags: Arc::new(PgCancelFlags::new(pool.clone())),
            audit: Arc::new(PgAuditSink::new(pool)),
        }
    }
}

fn run_state(run: MigrationRun) -> Result<RunState, EngineError> {
    let sync_mode = SyncMode::from_str(&run.sync_mode)
        .ok_or_else(|| EngineError::Store(format!("invalid sync_mode: {}", run.sync_mode)))?;
    let conflict_strategy = ConflictStrategy::from_str(&run.conflict_strategy).ok_or_else(|| {
        EngineError::Store(format!(
            "invalid conflict_strategy: {}",
            run.conflict_strategy
        ))
    })?;
    let status = RunStatus::from_str(&run.status)
        .ok_or_else(|| EngineError::Store(format!("invalid run status: {}", run.status)))?;
    Ok(RunState {
        id: run.id,
        name: run.name,
        is_dry_run: run.is_dry_run,
        sync_mode,
        conflict_strategy,
        status,
        last_sync_at: run.last_sync_at,
    })
}

fn ledger_state(entry: LedgerEntry) -> Result<LedgerState, EngineError> {
    let status = EntryStatus::from_str(&entry.status)
        .ok_or_else(|| EngineError::Store(format!("invalid ledger status: {}", entry.status)))?;
    Ok(LedgerState {
        status,
        target_id: entry.target_id.as_deref().map(TargetId::decode),
        last_synced_at: entry.last_synced_at,
    })
}

/// [`RunStore`] over the `migration_runs` table.
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn get(&self, run_id: DbId) -> Result<RunState, EngineError> {
        let run = RunRepo::find_by_id(&self.pool, run_id)
            .await?
            .ok_or(EngineError::RunNotFound(run_id))?;
        run_state(run)
    }

    async fn try_transition(
        &self,
        run_id: DbId,
        from: RunStatus,
        to: RunStatus,
    ) -> Result<bool, EngineError> {
        let updated = RunRepo::try_transition(&self.pool, run_id, from, to).await?;
        Ok(updated.is_some())
    }

    async fn enqueue(&self, run_id: DbId) -> Result<bool, EngineError> {
        Ok(RunRepo::enqueue(&self.pool, run_id).await?)
    }

    async fn advance_last_sync(
        &self,
        run_id: DbId,
        captured_at: Timestamp,
    ) -> Result<(), EngineError> {
        Ok(RunRepo::advance_last_sync(&self.pool, run_id, captured_at).await?)
    }

    async fn complete(&self, run_id: DbId) -> Result<bool, EngineError> {
        Ok(RunRepo::complete(&self.pool, run_id).await?)
    }

    async fn finish(
        &self,
        run_id: DbId,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), EngineError> {
        Ok(RunRepo::finish(&self.pool, run_id, status, error).await?)
    }
}

/// [`Ledger`] over the `migration_ledger` table.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn already_migrated(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<bool, EngineError> {
        Ok(LedgerRepo::already_migrated(&self.pool, entity_type, source_id, run_id).await?)
    }

    async fn target_of(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<TargetId>, EngineError> {
        let raw = LedgerRepo::get_target(&self.pool, entity_type, source_id, run_id).await?;
        Ok(raw.as_deref().map(TargetId::decode))
    }

    async fn state_of(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<Option<LedgerState>, EngineError> {
        let entry = LedgerRepo::find(&self.pool, entity_type, source_id, run_id).await?;
        entry.map(ledger_state).transpose()
    }

    async fn mark_pending(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), EngineError> {
        Ok(LedgerRepo::mark_pending_many(&self.pool, run_id, entity_type, source_ids).await?)
    }

    async fn reset_pending(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), EngineError> {
        Ok(LedgerRepo::reset_pending_many(&self.pool, run_id, entity_type, source_ids).await?)
    }

    async fn mark_running(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), EngineError> {
        Ok(LedgerRepo::mark_running(&self.pool, run_id, entity_type, source_id).await?)
    }

    async fn set_success(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        target: &TargetId,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), EngineError> {
        Ok(LedgerRepo::set_success(
            &self.pool,
            run_id,
            entity_type,
            source_id,
            &target.encode(),
            payload,
        )
        .await?)
    }

    async fn mark_failed(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        error: &str,
    ) -> Result<(), EngineError> {
        Ok(LedgerRepo::mark_failed(&self.pool, run_id, entity_type, source_id, error).await?)
    }

    async fn mark_skipped(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), EngineError> {
        Ok(LedgerRepo::mark_skipped(&self.pool, run_id, entity_type, source_id, payload).await?)
    }

    async fn flag_conflict(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), EngineError> {
        Ok(LedgerRepo::flag_conflict(&self.pool, run_id, entity_type, source_id).await?)
    }

    async fn target_map(
        &self,
        run_id: DbId,
        entity_type: EntityType,
    ) -> Result<HashMap<String, TargetId>, EngineError> {
        let raw = LedgerRepo::get_map(&self.pool, entity_type, run_id).await?;
        Ok(raw
            .into_iter()
            .map(|(source, target)| (source, TargetId::decode(&target)))
            .collect())
    }

    async fn state_map(
        &self,
        run_id: DbId,
        entity_type: EntityType,
    ) -> Result<HashMap<String, LedgerState>, EngineError> {
        let rows = LedgerRepo::entry_map(&self.pool, entity_type, run_id).await?;
        rows.into_iter()
            .map(|(source, entry)| ledger_state(entry).map(|state| (source, state)))
            .collect()
    }

    async fn fail_remaining(
        &self,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
        error: &str,
    ) -> Result<u64, EngineError> {
        Ok(
            LedgerRepo::mark_batch_failed(&self.pool, run_id, entity_type, source_ids, error)
                .await?,
        )
    }

    async fn status_counts(&self, run_id: DbId) -> Result<Vec<StatusCount>, EngineError> {
        let counts = LedgerRepo::count_by_status(&self.pool, run_id).await?;
        Ok(counts
            .into_iter()
            .map(|c| StatusCount {
                entity_type: c.entity_type,
                status: c.status,
                count: c.count,
            })
            .collect())
    }
}

/// [`CancelFlags`] over the `cancellation_flags` table.
pub struct PgCancelFlags {
    pool: PgPool,
}

impl PgCancelFlags {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CancelFlags for PgCancelFlags {
    async fn raise(&self, run_id: DbId) -> Result<(), EngineError> {
        Ok(CancellationRepo::cancel(&self.pool, run_id).await?)
    }

    async fn is_raised(&self, run_id: DbId) -> Result<bool, EngineError> {
        Ok(CancellationRepo::is_cancelled(&self.pool, run_id).await?)
    }

    async fn clear(&self, run_id: DbId) -> Result<(), EngineError> {
        Ok(CancellationRepo::clear(&self.pool, run_id).await?)
    }
}

/// [`AuditSink`] over the `audit_log` table.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(
        &self,
        run_id: DbId,
        entity_type: Option<EntityType>,
        source_id: Option<&str>,
        severity: Severity,
        message: &str,
    ) -> Result<(), EngineError> {
        AuditRepo::append(
            &self.pool,
            &CreateAuditEntry {
                run_id,
                entity_type: entity_type.map(|et| et.as_str().to_string()),
                source_id: source_id.map(str::to_string),
                severity: severity.as_str().to_string(),
                message: message.to_string(),
            },
        )
        .await?;
        Ok(())
    }
}

/// [`DestinationClient`] over the Shopware Admin API, with per-request
/// transport retry.
pub struct ShopwareDestination {
    api: ShopwareApi,
    retry: RetryConfig,
}

impl ShopwareDestination {
    pub fn new(api: ShopwareApi) -> Self {
        Self {
            api,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(api: ShopwareApi, retry: RetryConfig) -> Self {
        Self { api, retry }
    }
}

#[async_trait]
impl DestinationClient for ShopwareDestination {
    async fn create_or_find(
        &self,
        resource: &str,
        payload: &serde_json::Value,
        lookup_key: &str,
        lookup_value: &str,
    ) -> Result<String, EngineError> {
        let created = with_retry(&self.retry, || {
            self.api
                .create_or_find(resource, payload, lookup_key, lookup_value)
        })
        .await?;
        Ok(created.id)
    }

    async fn update(
        &self,
        resource: &str,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<(), EngineError> {
        with_retry(&self.retry, || self.api.put(resource, id, payload)).await?;
        Ok(())
    }

    async fn modified_at(
        &self,
        resource: &str,
        id: &str,
    ) -> Result<Option<Timestamp>, EngineError> {
        Ok(with_retry(&self.retry, || self.api.modified_at(resource, id)).await?)
    }
}
