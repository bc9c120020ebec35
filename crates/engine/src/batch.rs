//! Batch unit: the retryable unit of work (MIG-10).
//!
//! A batch owns a chunk of source ids for one entity type. The whole
//! batch body runs under a per-entity-type deadline and is retried a
//! bounded number of times with a fixed delay; the per-record
//! idempotency gate makes re-walking a partially completed batch safe.
//! Per-record failures are absorbed into the ledger and never abort
//! the batch; only store-level failures and deadline overruns trigger
//! a retry.

use std::time::Duration;

use storebridge_core::audit::Severity;
use storebridge_core::entity::EntityType;
use storebridge_core::ledger::{synthetic_key, TargetId};
use storebridge_core::policy::{evaluate_conflict, resolve_conflict, ConflictResolution};
use storebridge_core::run::{ConflictStrategy, SyncMode};
use storebridge_core::types::DbId;

use crate::collaborators::RunState;
use crate::error::EngineError;
use crate::pipeline::Engine;
use crate::record::{ResolvedRefs, SourceRecord};
use crate::registry::EntityHandler;

/// Attempts per batch, including the first.
pub const BATCH_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between batch attempts.
pub const BATCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How a batch settled.
#[derive(Debug, Clone, Copy)]
pub struct BatchOutcome {
    /// Ids walked by the final attempt.
    pub processed: usize,
    /// The cancellation flag stopped the batch mid-walk.
    pub cancelled: bool,
    /// Every attempt failed; remaining ids were swept to `failed`.
    pub exhausted: bool,
}

struct BatchAttempt {
    processed: usize,
    cancelled: bool,
}

/// Run one batch to completion, retrying store-level failures and
/// deadline overruns.
pub(crate) async fn run_batch(
    engine: &Engine,
    run: &RunState,
    entity_type: EntityType,
    ids: Vec<String>,
) -> Result<BatchOutcome, EngineError> {
    let handler = engine.registry.handler(entity_type)?;
    let deadline = Duration::from_secs(entity_type.batch_timeout_secs());
    let batch_id = uuid::Uuid::new_v4();
    let mut last_error: Option<EngineError> = None;

    tracing::debug!(
        run_id = run.id,
        entity_type = %entity_type,
        %batch_id,
        ids = ids.len(),
        "Batch starting",
    );

    for attempt in 1..=engine.options.batch_max_attempts {
        if attempt > 1 {
            tracing::warn!(
                run_id = run.id,
                entity_type = %entity_type,
                %batch_id,
                attempt,
                max_attempts = engine.options.batch_max_attempts,
                "Retrying batch",
            );
            tokio::time::sleep(engine.options.batch_retry_delay).await;
        }

        match tokio::time::timeout(deadline, walk_batch(engine, run, handler, entity_type, &ids))
            .await
        {
            Ok(Ok(result)) => {
                return Ok(BatchOutcome {
                    processed: result.processed,
                    cancelled: result.cancelled,
                    exhausted: false,
                });
            }
            Ok(Err(err)) => last_error = Some(err),
            Err(_) => last_error = Some(EngineError::BatchTimeout(deadline.as_secs())),
        }
    }

    let error = last_error.unwrap_or_else(|| EngineError::Invalid("batch failed".to_string()));
    let swept = engine
        .stores
        .ledger
        .fail_remaining(run.id, entity_type, &ids, &error.to_string())
        .await?;
    engine
        .stores
        .audit
        .record(
            run.id,
            Some(entity_type),
            None,
            Severity::Error,
            &format!(
                "Batch of {} {entity_type} records failed after {} attempts: {error}",
                ids.len(),
                engine.options.batch_max_attempts,
            ),
        )
        .await?;

    Ok(BatchOutcome {
        processed: swept as usize,
        cancelled: false,
        exhausted: true,
    })
}

/// One attempt over the batch's ids, record by record.
async fn walk_batch(
    engine: &Engine,
    run: &RunState,
    handler: &EntityHandler,
    entity_type: EntityType,
    ids: &[String],
) -> Result<BatchAttempt, EngineError> {
    let ledger = &engine.stores.ledger;
    let mut processed = 0;

    for source_id in ids {
        if engine.stores.flags.is_raised(run.id).await? {
            tracing::info!(
                run_id = run.id,
                entity_type = %entity_type,
                "Cancellation flag raised, stopping batch",
            );
            return Ok(BatchAttempt {
                processed,
                cancelled: true,
            });
        }

        if ledger.already_migrated(run.id, entity_type, source_id).await? {
            processed += 1;
            continue;
        }

        ledger.mark_running(run.id, entity_type, source_id).await?;
        if let Err(err) = migrate_record(engine, run, handler, entity_type, source_id).await {
            // A destination outage fails the whole attempt so the batch
            // retry path owns it; per-record rejections stay item-level.
            if matches!(err, EngineError::DestinationUnavailable(_)) {
                return Err(err);
            }
            tracing::warn!(
                run_id = run.id,
                entity_type = %entity_type,
                source_id,
                error = %err,
                "Record migration failed",
            );
            ledger
                .mark_failed(run.id, entity_type, source_id, &err.to_string())
                .await?;
        }
        processed += 1;
    }

    Ok(BatchAttempt {
        processed,
        cancelled: false,
    })
}

/// Migrate one record: fetch, resolve references, transform, apply the
/// delta/conflict policy, write to the destination, record in the
/// ledger.
async fn migrate_record(
    engine: &Engine,
    run: &RunState,
    handler: &EntityHandler,
    entity_type: EntityType,
    source_id: &str,
) -> Result<(), EngineError> {
    let ledger = &engine.stores.ledger;

    let record = handler
        .reader
        .fetch_by_id(entity_type, source_id)
        .await?
        .ok_or_else(|| EngineError::SourceRecordMissing {
            source_id: source_id.to_string(),
        })?;

    let refs = resolve_references(engine, run.id, &record).await?;
    let payload = handler.transformer.transform(&record, &refs)?;

    if run.is_dry_run {
        ledger
            .mark_skipped(run.id, entity_type, source_id, Some(&payload))
            .await?;
        return Ok(());
    }

    // Virtual entities never reach the destination API; their target is
    // a synthetic key derived from the record name.
    if entity_type.is_virtual() {
        let name = record
            .data
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(source_id);
        let target = TargetId::Synthetic(synthetic_key(entity_type, name));
        ledger
            .set_success(run.id, entity_type, source_id, &target, Some(&payload))
            .await?;
        return Ok(());
    }

    let prior = ledger.state_of(run.id, entity_type, source_id).await?;
    let known_remote = prior
        .as_ref()
        .and_then(|s| s.target_id.as_ref())
        .and_then(|t| t.as_remote())
        .map(str::to_string);

    // Conflict detection is pluggable and only consulted when the
    // strategy can change the outcome; source-wins overwrites anyway.
    let mut destination_missing = false;
    if run.sync_mode == SyncMode::Delta && run.conflict_strategy != ConflictStrategy::SourceWins {
        if let (Some(state), Some(remote)) = (&prior, &known_remote) {
            let modified = engine
                .destination
                .modified_at(handler.endpoint.resource, remote)
                .await?;
            destination_missing = modified.is_none();
            let check = evaluate_conflict(modified, state.last_synced_at);
            if check.has_conflict {
                match resolve_conflict(run.conflict_strategy) {
                    ConflictResolution::Update => {}
                    ConflictResolution::Skip => {
                        ledger
                            .mark_skipped(run.id, entity_type, source_id, Some(&payload))
                            .await?;
                        engine
                            .stores
                            .audit
                            .record(
                                run.id,
                                Some(entity_type),
                                Some(source_id),
                                Severity::Info,
                                "Destination changed since last sync, keeping destination state",
                            )
                            .await?;
                        return Ok(());
                    }
                    ConflictResolution::Flag => {
                        ledger
                            .mark_skipped(run.id, entity_type, source_id, Some(&payload))
                            .await?;
                        ledger.flag_conflict(run.id, entity_type, source_id).await?;
                        engine
                            .stores
                            .audit
                            .record(
                                run.id,
                                Some(entity_type),
                                Some(source_id),
                                Severity::Warning,
                                "Destination changed since last sync, flagged for manual review",
                            )
                            .await?;
                        return Ok(());
                    }
                }
            }
        }
    }

    // Update in place when the ledger already knows the remote record,
    // create-or-find otherwise. A known remote record that vanished
    // from the destination is not a conflict; it needs re-creating
    // under a fresh id.
    let target = match known_remote {
        Some(remote) if !destination_missing => {
            match engine
                .destination
                .update(handler.endpoint.resource, &remote, &payload)
                .await
            {
                Ok(()) => TargetId::Remote(remote),
                Err(EngineError::DestinationMissing(_)) => {
                    create_target(engine, handler, &payload, source_id).await?
                }
                Err(err) => return Err(err),
            }
        }
        _ => create_target(engine, handler, &payload, source_id).await?,
    };

    ledger
        .set_success(run.id, entity_type, source_id, &target, Some(&payload))
        .await?;

    // Products carry dependent sub-records (variants, cross-sells)
    // migrated synchronously inside the parent's slot so they can
    // reference the parent's fresh target id.
    if entity_type == EntityType::Product {
        migrate_children(engine, run, handler, source_id, &target).await?;
    }

    Ok(())
}

/// Create the destination record (or find an existing one by lookup
/// value) and return its target id.
async fn create_target(
    engine: &Engine,
    handler: &EntityHandler,
    payload: &serde_json::Value,
    source_id: &str,
) -> Result<TargetId, EngineError> {
    let lookup_value = payload
        .get(handler.endpoint.lookup_key)
        .and_then(|v| v.as_str())
        .unwrap_or(source_id)
        .to_string();
    let id = engine
        .destination
        .create_or_find(
            handler.endpoint.resource,
            payload,
            handler.endpoint.lookup_key,
            &lookup_value,
        )
        .await?;
    Ok(TargetId::Remote(id))
}

/// Migrate a product's dependent sub-records. A child failure marks
/// the child failed without failing the already-migrated parent.
async fn migrate_children(
    engine: &Engine,
    run: &RunState,
    handler: &EntityHandler,
    parent_id: &str,
    parent_target: &TargetId,
) -> Result<(), EngineError> {
    let ledger = &engine.stores.ledger;
    let children = handler
        .reader
        .fetch_children(EntityType::Product, parent_id)
        .await?;

    for child in children {
        if ledger
            .already_migrated(run.id, EntityType::Product, &child.source_id)
            .await?
        {
            continue;
        }

        let outcome = migrate_child(engine, run, handler, &child, parent_target).await;
        if let Err(err) = outcome {
            if matches!(err, EngineError::DestinationUnavailable(_)) {
                return Err(err);
            }
            tracing::warn!(
                run_id = run.id,
                parent_id,
                child_id = %child.source_id,
                error = %err,
                "Product sub-record migration failed",
            );
            ledger
                .mark_failed(run.id, EntityType::Product, &child.source_id, &err.to_string())
                .await?;
        }
    }
    Ok(())
}

async fn migrate_child(
    engine: &Engine,
    run: &RunState,
    handler: &EntityHandler,
    child: &SourceRecord,
    parent_target: &TargetId,
) -> Result<(), EngineError> {
    let mut refs = resolve_references(engine, run.id, child).await?;
    refs.insert("parent".to_string(), parent_target.clone());
    let payload = handler.transformer.transform(child, &refs)?;

    let target = create_target(engine, handler, &payload, &child.source_id).await?;
    engine
        .stores
        .ledger
        .set_success(
            run.id,
            EntityType::Product,
            &child.source_id,
            &target,
            Some(&payload),
        )
        .await
}

/// Resolve a record's cross-entity references against earlier stages'
/// ledger rows. Unmigrated references are omitted, never an error.
async fn resolve_references(
    engine: &Engine,
    run_id: DbId,
    record: &SourceRecord,
) -> Result<ResolvedRefs, EngineError> {
    let mut refs = ResolvedRefs::new();
    for reference in &record.references {
        match engine
            .stores
            .ledger
            .target_of(run_id, reference.entity_type, &reference.source_id)
            .await?
        {
            Some(target) => {
                refs.insert(reference.field.clone(), target);
            }
            None => {
                tracing::debug!(
                    run_id,
                    entity_type = %reference.entity_type,
                    source_id = %reference.source_id,
                    field = %reference.field,
                    "Reference target not migrated, omitting",
                );
            }
        }
    }
    Ok(refs)
}
