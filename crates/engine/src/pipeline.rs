//! Pipeline controller (MIG-08).
//!
//! Walks the ordered stage plan as an explicit continuation: each
//! stage settles completely (all batch sub-tasks done) before the next
//! begins, so cross-entity references always resolve against a settled
//! ledger. Terminal handling is compare-and-set: the run completes
//! only if it is still `running` when the last stage settles.

use std::sync::Arc;
use std::time::Duration;

use storebridge_core::audit::Severity;
use storebridge_core::entity::{EntityType, STAGE_ORDER};
use storebridge_core::run::RunStatus;
use storebridge_core::types::DbId;

use crate::batch::{BATCH_MAX_ATTEMPTS, BATCH_RETRY_DELAY};
use crate::collaborators::DestinationClient;
use crate::control::Stores;
use crate::error::EngineError;
use crate::registry::EntityRegistry;
use crate::stage::run_stage;

/// Tunable pipeline parameters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Batches in flight at once within one stage.
    pub batch_parallelism: usize,
    /// Attempts per batch, including the first.
    pub batch_max_attempts: u32,
    /// Fixed delay between batch attempts.
    pub batch_retry_delay: Duration,
    /// Whether the optional CMS pages stage is part of the plan.
    pub include_cms_pages: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_parallelism: 4,
            batch_max_attempts: BATCH_MAX_ATTEMPTS,
            batch_retry_delay: BATCH_RETRY_DELAY,
            include_cms_pages: false,
        }
    }
}

/// One run's worth of orchestration wiring.
pub struct Engine {
    pub stores: Stores,
    pub destination: Arc<dyn DestinationClient>,
    pub registry: EntityRegistry,
    pub options: PipelineOptions,
}

/// The ordered stage plan for these options.
pub fn stage_plan(options: &PipelineOptions) -> Vec<EntityType> {
    STAGE_ORDER
        .iter()
        .copied()
        .filter(|et| options.include_cms_pages || *et != EntityType::CmsPage)
        .collect()
}

/// Execute a claimed (already `running`) run to a settled state.
///
/// Returns the run's resulting status. Stage failures and cancellation
/// finish the run as `failed` with the ledger retained for resume; a
/// pause observed at a stage boundary stops the walk without touching
/// terminal state.
pub async fn execute_run(engine: &Engine, run_id: DbId) -> Result<RunStatus, EngineError> {
    let run = engine.stores.runs.get(run_id).await?;
    if run.status != RunStatus::Running {
        return Err(EngineError::InvalidRunState {
            run_id,
            status: run.status,
            expected: RunStatus::Running,
        });
    }

    if engine.registry.is_empty() {
        let message = "No entity handlers registered for this run";
        engine
            .stores
            .runs
            .finish(run_id, RunStatus::Failed, Some(message))
            .await?;
        engine
            .stores
            .audit
            .record(run_id, None, None, Severity::Error, message)
            .await?;
        return Ok(RunStatus::Failed);
    }

    for entity_type in stage_plan(&engine.options) {
        if !engine.registry.is_registered(entity_type) {
            tracing::debug!(run_id, entity_type = %entity_type, "No handler, skipping stage");
            continue;
        }

        // Pause is honored at stage boundaries only; a paused run keeps
        // its settled stages and is re-queued by the operator.
        let current = engine.stores.runs.get(run_id).await?;
        if current.status == RunStatus::Paused {
            engine
                .stores
                .audit
                .record(
                    run_id,
                    None,
                    None,
                    Severity::Info,
                    "Run paused, stopping after settled stages",
                )
                .await?;
            return Ok(RunStatus::Paused);
        }

        match run_stage(engine, run_id, entity_type).await {
            Ok(report) => {
                tracing::info!(
                    run_id,
                    entity_type = %entity_type,
                    selected = report.selected,
                    unchanged = report.unchanged,
                    exhausted_batches = report.exhausted_batches,
                    "Stage settled",
                );
            }
            Err(EngineError::Cancelled) => {
                engine
                    .stores
                    .runs
                    .finish(run_id, RunStatus::Failed, Some("cancelled by operator"))
                    .await?;
                engine
                    .stores
                    .audit
                    .record(
                        run_id,
                        Some(entity_type),
                        None,
                        Severity::Warning,
                        "Run cancelled, ledger retained for resume",
                    )
                    .await?;
                return Ok(RunStatus::Failed);
            }
            Err(err) => {
                let message = err.to_string();
                engine
                    .stores
                    .runs
                    .finish(run_id, RunStatus::Failed, Some(&message))
                    .await?;
                engine
                    .stores
                    .audit
                    .record(
                        run_id,
                        Some(entity_type),
                        None,
                        Severity::Error,
                        &format!("Stage {entity_type} failed: {message}"),
                    )
                    .await?;
                return Ok(RunStatus::Failed);
            }
        }
    }

    if engine.stores.runs.complete(run_id).await? {
        engine.stores.flags.clear(run_id).await?;
        engine
            .stores
            .audit
            .record(run_id, None, None, Severity::Info, "Run completed")
            .await?;
        return Ok(RunStatus::Completed);
    }

    // Lost the terminal race (paused or failed elsewhere); report
    // whatever the run settled as.
    let settled = engine.stores.runs.get(run_id).await?;
    Ok(settled.status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_omits_cms_pages() {
        let plan = stage_plan(&PipelineOptions::default());
        assert!(!plan.contains(&EntityType::CmsPage));
        assert_eq!(plan.len(), STAGE_ORDER.len() - 1);
    }

    #[test]
    fn opt_in_plan_ends_with_cms_pages() {
        let options = PipelineOptions {
            include_cms_pages: true,
            ..Default::default()
        };
        let plan = stage_plan(&options);
        assert_eq!(plan.last(), Some(&EntityType::CmsPage));
        assert_eq!(plan.len(), STAGE_ORDER.len());
    }

    #[test]
    fn plan_preserves_canonical_order() {
        let plan = stage_plan(&PipelineOptions::default());
        let mut expected: Vec<EntityType> = STAGE_ORDER.to_vec();
        expected.retain(|et| *et != EntityType::CmsPage);
        assert_eq!(plan, expected);
    }
}
