//! Repository for the `migration_runs` table (MIG-04).
//!
//! Status transitions use compare-and-set updates so concurrent
//! control requests cannot skip lifecycle states; the valid transition
//! set itself lives in `storebridge_core::run::can_transition`, which
//! the engine control plane consults before each compare-and-set.

use sqlx::PgPool;
use storebridge_core::run::RunStatus;
use storebridge_core::types::{DbId, Timestamp};

use crate::models::migration_run::{CreateMigrationRun, MigrationRun};

/// Column list for migration_runs queries.
const COLUMNS: &str = "id, name, source_config, destination_config, is_dry_run, \
    sync_mode, conflict_strategy, status, queued_at, started_at, finished_at, \
    last_sync_at, error_message, created_at, updated_at";

/// Maximum page size for run listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for run listing.
const DEFAULT_LIMIT: i64 = 25;

/// Provides CRUD operations for migration runs.
pub struct RunRepo;

impl RunRepo {
    /// Create a new run in `pending` status, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMigrationRun,
    ) -> Result<MigrationRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO migration_runs
                (name, source_config, destination_config, is_dry_run, sync_mode, conflict_strategy, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(&input.name)
            .bind(&input.source_config)
            .bind(&input.destination_config)
            .bind(input.is_dry_run)
            .bind(&input.sync_mode)
            .bind(&input.conflict_strategy)
            .bind(RunStatus::Pending.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a run by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM migration_runs WHERE id = $1");
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List runs, newest first.
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<MigrationRun>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM migration_runs
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Compare-and-set status transition.
    ///
    /// Returns the updated row, or `None` if the run was not in `from`
    /// status (lost race or invalid state).
    pub async fn try_transition(
        pool: &PgPool,
        id: DbId,
        from: RunStatus,
        to: RunStatus,
    ) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migration_runs SET status = $3
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Enqueue a pending run for worker pickup.
    ///
    /// Returns `false` if the run is not in `pending` status.
    pub async fn enqueue(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE migration_runs SET queued_at = NOW()
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(RunStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim the next enqueued run for a worker.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so multiple worker
    /// processes cannot claim the same run. The claimed run moves to
    /// `running` and keeps its original `started_at` when resuming.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<MigrationRun>, sqlx::Error> {
        let query = format!(
            "UPDATE migration_runs
             SET status = $1, started_at = COALESCE(started_at, NOW())
             WHERE id = (
                 SELECT id FROM migration_runs
                 WHERE status = $2 AND queued_at IS NOT NULL
                 ORDER BY queued_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MigrationRun>(&query)
            .bind(RunStatus::Running.as_str())
            .bind(RunStatus::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Advance the delta high-water mark. Never rewinds: the stored
    /// value only moves forward.
    pub async fn advance_last_sync(
        pool: &PgPool,
        id: DbId,
        captured_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE migration_runs
             SET last_sync_at = GREATEST(COALESCE(last_sync_at, 'epoch'::timestamptz), $2)
             WHERE id = $1",
        )
        .bind(id)
        .bind(captured_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Complete a run that is still `running`, stamping `finished_at`.
    ///
    /// Returns `false` when the run moved elsewhere (paused, failed)
    /// between the last stage settling and this call.
    pub async fn complete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE migration_runs
             SET status = $2, finished_at = NOW(), error_message = NULL
             WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(RunStatus::Completed.as_str())
        .bind(RunStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a run to a terminal status with an optional error message.
    ///
    /// Idempotent: a run already in the requested status is left
    /// untouched (its original `finished_at` survives).
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE migration_runs
             SET status = $2, finished_at = NOW(), error_message = $3
             WHERE id = $1 AND status != $2",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }
}
