//! Repository for the `cancellation_flags` table (MIG-05).
//!
//! The flag is externalized state rather than an in-process global
//! because batches for one run execute across worker processes. It is
//! advisory and polled; an expired flag reads as not-cancelled.

use sqlx::PgPool;
use storebridge_core::types::DbId;

/// Flag time-to-live in seconds (24 hours).
pub const CANCELLATION_TTL_SECS: i64 = 24 * 60 * 60;

/// Provides set/poll/clear operations for per-run cancellation flags.
pub struct CancellationRepo;

impl CancellationRepo {
    /// Raise the cancellation flag for a run. Re-raising refreshes the
    /// TTL.
    pub async fn cancel(pool: &PgPool, run_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO cancellation_flags (run_id, expires_at)
             VALUES ($1, NOW() + make_interval(secs => $2))
             ON CONFLICT (run_id)
             DO UPDATE SET expires_at = EXCLUDED.expires_at",
        )
        .bind(run_id)
        .bind(CANCELLATION_TTL_SECS as f64)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether a live (unexpired) cancellation flag exists for a run.
    pub async fn is_cancelled(pool: &PgPool, run_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM cancellation_flags
                 WHERE run_id = $1 AND expires_at > NOW()
             )",
        )
        .bind(run_id)
        .fetch_one(pool)
        .await
    }

    /// Clear the flag. Safe to call when no flag exists.
    pub async fn clear(pool: &PgPool, run_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM cancellation_flags WHERE run_id = $1")
            .bind(run_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
