//! Stage driver: one entity type end to end (MIG-13).
//!
//! Builds the working set (full or delta), runs the per-record delta
//! decision pass, marks selected ids in the ledger up front, chunks
//! them into batch units fanned out with bounded concurrency, waits
//! for every batch to settle, and advances the run's delta high-water
//! mark. Batch exhaustion is tolerated (the sweep already recorded the
//! failures); only store-level failures and cancellation abort the
//! stage.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use storebridge_core::audit::Severity;
use storebridge_core::entity::{chunk_ids, EntityType};
use storebridge_core::policy::{should_migrate, MigrationAction};
use storebridge_core::run::SyncMode;
use storebridge_core::types::DbId;

use crate::batch::run_batch;
use crate::error::EngineError;
use crate::pipeline::Engine;

/// How a stage settled.
#[derive(Debug, Clone, Copy)]
pub struct StageReport {
    pub entity_type: EntityType,
    /// Records selected by the decision pass.
    pub selected: usize,
    /// Records skipped as unchanged since the last sync point.
    pub unchanged: usize,
    pub batches: usize,
    /// Batches that exhausted their retries.
    pub exhausted_batches: usize,
}

/// Drive one stage to completion.
///
/// Returns [`EngineError::Cancelled`] when the cancellation flag is
/// observed, leaving already-settled ledger rows untouched.
pub(crate) async fn run_stage(
    engine: &Engine,
    run_id: DbId,
    entity_type: EntityType,
) -> Result<StageReport, EngineError> {
    if engine.stores.flags.is_raised(run_id).await? {
        return Err(EngineError::Cancelled);
    }

    let run = engine.stores.runs.get(run_id).await?;
    let handler = engine.registry.handler(entity_type)?;

    // Captured before the source read so records changing mid-stage
    // fall on the selected side of the next delta pass.
    let captured_at = Utc::now();

    let records = match (run.sync_mode, run.last_sync_at) {
        (SyncMode::Full, _) | (SyncMode::Delta, None) => {
            handler.reader.fetch_all(entity_type).await?
        }
        (SyncMode::Delta, Some(since)) => {
            handler.reader.fetch_updated_since(entity_type, since).await?
        }
    };

    let states = engine.stores.ledger.state_map(run_id, entity_type).await?;
    let mut selected = Vec::new();
    let mut demote = Vec::new();
    let mut unchanged = 0;

    for record in &records {
        let decision = should_migrate(
            run.sync_mode,
            run.last_sync_at,
            states.contains_key(&record.source_id),
            record.updated_at,
        );
        if !decision.should_migrate {
            unchanged += 1;
            continue;
        }
        // Delta-selected updates may sit on a success row from an
        // earlier pass of this run; those must be demoted back to
        // pending or the idempotency gate would skip the new change.
        if decision.action == MigrationAction::Update {
            demote.push(record.source_id.clone());
        }
        selected.push(record.source_id.clone());
    }

    engine
        .stores
        .ledger
        .mark_pending(run_id, entity_type, &selected)
        .await?;
    engine
        .stores
        .ledger
        .reset_pending(run_id, entity_type, &demote)
        .await?;

    let chunks = chunk_ids(entity_type, &selected);
    let batches = chunks.len();
    tracing::info!(
        run_id,
        entity_type = %entity_type,
        selected = selected.len(),
        unchanged,
        batches,
        "Stage working set built",
    );

    let mut cancelled = false;
    let mut exhausted_batches = 0;
    {
        // All batches must settle before the stage does; the stream is
        // drained even after a cancellation is observed.
        let mut settling = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| run_batch(engine, &run, entity_type, chunk)),
        )
        .buffer_unordered(engine.options.batch_parallelism.max(1));

        while let Some(outcome) = settling.next().await {
            let outcome = outcome?;
            if outcome.cancelled {
                cancelled = true;
            }
            if outcome.exhausted {
                exhausted_batches += 1;
            }
        }
    }

    if cancelled || engine.stores.flags.is_raised(run_id).await? {
        return Err(EngineError::Cancelled);
    }

    // Advance the high-water mark only once every batch has settled,
    // and never for dry runs (nothing was written).
    if !run.is_dry_run {
        engine
            .stores
            .runs
            .advance_last_sync(run_id, captured_at)
            .await?;
    }

    engine
        .stores
        .audit
        .record(
            run_id,
            Some(entity_type),
            None,
            Severity::Info,
            &format!(
                "Stage {entity_type} settled: {} selected, {unchanged} unchanged, {batches} batches, {exhausted_batches} exhausted",
                selected.len(),
            ),
        )
        .await?;

    Ok(StageReport {
        entity_type,
        selected: selected.len(),
        unchanged,
        batches,
        exhausted_batches,
    })
}
