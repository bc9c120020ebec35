//! Control-plane tests: start, pause, resume, cancel, status report.

mod support;

use assert_matches::assert_matches;
use storebridge_core::entity::EntityType;
use storebridge_core::ledger::{EntryStatus, TargetId};
use storebridge_core::run::{ConflictStrategy, RunStatus, SyncMode};
use storebridge_engine::{EngineError, Ledger};

use support::*;

fn pending_harness() -> Harness {
    let mut run = running_run(SyncMode::Full, ConflictStrategy::SourceWins);
    run.status = RunStatus::Pending;
    Harness::new(run)
}

#[tokio::test]
async fn start_enqueues_a_pending_run_and_clears_stale_flags() {
    let harness = pending_harness();
    // Leftover flag from an earlier cancelled attempt.
    harness.flags.raise_now(RUN_ID);

    harness.stores().start_run(RUN_ID).await.unwrap();

    assert!(harness.runs.is_queued(RUN_ID));
    assert!(!harness.flags.is_raised_now(RUN_ID));
    assert!(harness.audit.contains("Run enqueued"));
}

#[tokio::test]
async fn start_rejects_a_non_pending_run() {
    let harness = Harness::new(running_run(SyncMode::Full, ConflictStrategy::SourceWins));

    let err = harness.stores().start_run(RUN_ID).await.unwrap_err();
    assert_matches!(
        err,
        EngineError::InvalidRunState {
            status: RunStatus::Running,
            expected: RunStatus::Pending,
            ..
        }
    );
}

#[tokio::test]
async fn pause_then_resume_requeues_the_run() {
    let harness = Harness::new(running_run(SyncMode::Full, ConflictStrategy::SourceWins));
    let stores = harness.stores();

    stores.pause_run(RUN_ID).await.unwrap();
    assert_eq!(harness.runs.status(RUN_ID), RunStatus::Paused);

    stores.resume_run(RUN_ID).await.unwrap();
    assert_eq!(harness.runs.status(RUN_ID), RunStatus::Pending);
    assert!(harness.runs.is_queued(RUN_ID));
    assert!(harness.audit.contains("Run resumed"));
}

#[tokio::test]
async fn pause_rejects_a_run_that_is_not_running() {
    let harness = pending_harness();

    let err = harness.stores().pause_run(RUN_ID).await.unwrap_err();
    assert_matches!(
        err,
        EngineError::InvalidRunState {
            expected: RunStatus::Running,
            ..
        }
    );
}

#[tokio::test]
async fn settled_runs_cannot_be_paused_or_resumed() {
    let harness = Harness::new(running_run(SyncMode::Full, ConflictStrategy::SourceWins));

    harness.runs.set_status(RUN_ID, RunStatus::Completed);
    assert_matches!(
        harness.stores().pause_run(RUN_ID).await.unwrap_err(),
        EngineError::InvalidRunState {
            status: RunStatus::Completed,
            ..
        }
    );

    harness.runs.set_status(RUN_ID, RunStatus::Failed);
    assert_matches!(
        harness.stores().resume_run(RUN_ID).await.unwrap_err(),
        EngineError::InvalidRunState {
            status: RunStatus::Failed,
            ..
        }
    );
    assert_eq!(harness.runs.status(RUN_ID), RunStatus::Failed);
}

#[tokio::test]
async fn cancel_raises_the_flag_and_fails_the_run() {
    let harness = Harness::new(running_run(SyncMode::Full, ConflictStrategy::SourceWins));

    harness.stores().cancel_run(RUN_ID).await.unwrap();

    assert!(harness.flags.is_raised_now(RUN_ID));
    assert_eq!(harness.runs.status(RUN_ID), RunStatus::Failed);
    assert_eq!(
        harness.runs.last_error(RUN_ID).as_deref(),
        Some("cancelled by operator"),
    );
    assert!(harness.audit.contains("Run cancelled"));
}

#[tokio::test]
async fn cancel_rejects_a_terminal_run() {
    let harness = Harness::new(running_run(SyncMode::Full, ConflictStrategy::SourceWins));
    harness.runs.set_status(RUN_ID, RunStatus::Completed);

    let err = harness.stores().cancel_run(RUN_ID).await.unwrap_err();
    assert_matches!(err, EngineError::Invalid(_));
}

#[tokio::test]
async fn status_report_aggregates_ledger_counts() {
    let harness = Harness::new(running_run(SyncMode::Full, ConflictStrategy::SourceWins));
    harness.ledger.seed_success(
        RUN_ID,
        EntityType::Category,
        "c1",
        TargetId::Remote("dst-1".to_string()),
        None,
    );
    harness.ledger.seed_success(
        RUN_ID,
        EntityType::Category,
        "c2",
        TargetId::Remote("dst-2".to_string()),
        None,
    );
    harness
        .ledger
        .mark_failed(RUN_ID, EntityType::Product, "p1", "boom")
        .await
        .unwrap();
    harness.flags.raise_now(RUN_ID);

    let report = harness.stores().status_report(RUN_ID).await.unwrap();

    assert_eq!(report.run.id, RUN_ID);
    assert!(report.cancel_requested);
    let category = report
        .counts
        .iter()
        .find(|c| c.entity_type == "category" && c.status == EntryStatus::Success.as_str())
        .unwrap();
    assert_eq!(category.count, 2);
    let product = report
        .counts
        .iter()
        .find(|c| c.entity_type == "product" && c.status == EntryStatus::Failed.as_str())
        .unwrap();
    assert_eq!(product.count, 1);
}
