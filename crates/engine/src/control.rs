//! Run control plane: start, pause, resume, cancel, status (MIG-05).
//!
//! These operations never drive the pipeline themselves; they mutate
//! lifecycle state and flags that workers and in-flight batches poll.
//! Every mutation is gated on `can_transition` against the run's
//! current status before its compare-and-set.
//! Cancellation in particular is a raised flag plus a terminal status,
//! not a kill: batches stop at their next poll and the ledger survives
//! for a later resume.

use std::sync::Arc;

use storebridge_core::audit::Severity;
use storebridge_core::run::{can_transition, RunStatus};
use storebridge_core::types::DbId;

use crate::collaborators::{AuditSink, CancelFlags, Ledger, RunState, RunStore, StatusCount};
use crate::error::EngineError;

/// The engine's control-plane stores, grouped for handed-around use.
#[derive(Clone)]
pub struct Stores {
    pub runs: Arc<dyn RunStore>,
    pub ledger: Arc<dyn Ledger>,
    pub flags: Arc<dyn CancelFlags>,
    pub audit: Arc<dyn AuditSink>,
}

/// Aggregated run status for the observability surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub run: RunState,
    pub counts: Vec<StatusCount>,
    pub cancel_requested: bool,
}

impl Stores {
    /// Queue a pending run for worker pickup. Clears any stale
    /// cancellation flag left by an earlier cancelled attempt.
    pub async fn start_run(&self, run_id: DbId) -> Result<(), EngineError> {
        let run = self.runs.get(run_id).await?;
        if run.status != RunStatus::Pending {
            return Err(EngineError::InvalidRunState {
                run_id,
                status: run.status,
                expected: RunStatus::Pending,
            });
        }
        if !self.runs.enqueue(run_id).await? {
            return Err(EngineError::InvalidRunState {
                run_id,
                status: run.status,
                expected: RunStatus::Pending,
            });
        }
        self.flags.clear(run_id).await?;
        self.audit
            .record(run_id, None, None, Severity::Info, "Run enqueued")
            .await?;
        Ok(())
    }

    /// Pause a running run. The pipeline honors this at the next stage
    /// boundary; in-flight batches settle first.
    pub async fn pause_run(&self, run_id: DbId) -> Result<(), EngineError> {
        let run = self.runs.get(run_id).await?;
        if !can_transition(run.status, RunStatus::Paused)
            || !self
                .runs
                .try_transition(run_id, RunStatus::Running, RunStatus::Paused)
                .await?
        {
            return Err(EngineError::InvalidRunState {
                run_id,
                status: run.status,
                expected: RunStatus::Running,
            });
        }
        self.audit
            .record(run_id, None, None, Severity::Info, "Run paused")
            .await?;
        Ok(())
    }

    /// Re-queue a paused run. The ledger's idempotency gate makes the
    /// next execution skip work that already succeeded.
    pub async fn resume_run(&self, run_id: DbId) -> Result<(), EngineError> {
        let run = self.runs.get(run_id).await?;
        if !can_transition(run.status, RunStatus::Pending)
            || !self
                .runs
                .try_transition(run_id, RunStatus::Paused, RunStatus::Pending)
                .await?
        {
            return Err(EngineError::InvalidRunState {
                run_id,
                status: run.status,
                expected: RunStatus::Paused,
            });
        }
        self.runs.enqueue(run_id).await?;
        self.audit
            .record(run_id, None, None, Severity::Info, "Run resumed")
            .await?;
        Ok(())
    }

    /// Cancel a non-terminal run: raise the flag for in-flight batches
    /// and fail the run. The ledger is retained for resume.
    pub async fn cancel_run(&self, run_id: DbId) -> Result<(), EngineError> {
        let run = self.runs.get(run_id).await?;
        if !can_transition(run.status, RunStatus::Failed) {
            return Err(EngineError::Invalid(format!(
                "run {run_id} is already {}",
                run.status
            )));
        }
        self.flags.raise(run_id).await?;
        self.runs
            .finish(run_id, RunStatus::Failed, Some("cancelled by operator"))
            .await?;
        self.audit
            .record(
                run_id,
                None,
                None,
                Severity::Warning,
                "Run cancelled, in-flight batches stop at their next poll",
            )
            .await?;
        Ok(())
    }

    /// The run row plus per-entity ledger status counts.
    pub async fn status_report(&self, run_id: DbId) -> Result<RunReport, EngineError> {
        let run = self.runs.get(run_id).await?;
        let counts = self.ledger.status_counts(run_id).await?;
        let cancel_requested = self.flags.is_raised(run_id).await?;
        Ok(RunReport {
            run,
            counts,
            cancel_requested,
        })
    }
}
