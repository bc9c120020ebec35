//! Repository for the `migration_ledger` table (MIG-07).
//!
//! Every mutation is a keyed upsert on the unique
//! (run_id, entity_type, source_id) constraint, so concurrent batch
//! units writing the same row converge instead of racing duplicate
//! destination records. `mark_pending_many` never demotes a `success`
//! row, which is what lets resumed runs skip completed work.

use std::collections::HashMap;

use sqlx::PgPool;
use storebridge_core::entity::EntityType;
use storebridge_core::ledger::{truncate_error, EntryStatus};
use storebridge_core::types::DbId;

use crate::models::ledger_entry::{LedgerEntry, LedgerStatusCount};

/// Column list for migration_ledger queries.
const COLUMNS: &str = "id, run_id, entity_type, source_id, status, target_id, \
    payload, error_message, shopware_updated_at, last_synced_at, sync_status, \
    created_at, updated_at";

/// Maximum page size for ledger listing.
const MAX_LIMIT: i64 = 500;

/// Default page size for ledger listing.
const DEFAULT_LIMIT: i64 = 100;

/// Provides upsert and lookup operations for ledger entries.
pub struct LedgerRepo;

impl LedgerRepo {
    /// True iff a `success` row exists for this record.
    ///
    /// The idempotency gate at the top of every per-item operation.
    pub async fn already_migrated(
        pool: &PgPool,
        entity_type: EntityType,
        source_id: &str,
        run_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM migration_ledger
                 WHERE run_id = $1 AND entity_type = $2 AND source_id = $3 AND status = $4
             )",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_id)
        .bind(EntryStatus::Success.as_str())
        .fetch_one(pool)
        .await
    }

    /// Cross-reference lookup: the encoded target id of a successfully
    /// migrated record. Absent rows and non-success rows return `None`;
    /// callers omit the reference rather than failing.
    pub async fn get_target(
        pool: &PgPool,
        entity_type: EntityType,
        source_id: &str,
        run_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT target_id FROM migration_ledger
             WHERE run_id = $1 AND entity_type = $2 AND source_id = $3 AND status = $4",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_id)
        .bind(EntryStatus::Success.as_str())
        .fetch_optional(pool)
        .await
        .map(Option::flatten)
    }

    /// Find one ledger entry.
    pub async fn find(
        pool: &PgPool,
        entity_type: EntityType,
        source_id: &str,
        run_id: DbId,
    ) -> Result<Option<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM migration_ledger
             WHERE run_id = $1 AND entity_type = $2 AND source_id = $3"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(run_id)
            .bind(entity_type.as_str())
            .bind(source_id)
            .fetch_optional(pool)
            .await
    }

    /// Upsert a batch of ids to `pending`.
    ///
    /// Rows already in `success` are left untouched so a resumed run
    /// can distinguish "seen and done" from "seen but not done".
    pub async fn mark_pending_many(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), sqlx::Error> {
        if source_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO migration_ledger (run_id, entity_type, source_id, status)
             SELECT $1, $2, unnest($3::text[]), $4
             ON CONFLICT (run_id, entity_type, source_id)
             DO UPDATE SET status = EXCLUDED.status, error_message = NULL, updated_at = NOW()
             WHERE migration_ledger.status != $5",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_ids)
        .bind(EntryStatus::Pending.as_str())
        .bind(EntryStatus::Success.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Force a batch of ids back to `pending`, demoting `success` rows
    /// too. Used when a delta pass selects records whose prior success
    /// predates a newer source change; the stored target id survives so
    /// the batch can update the existing destination record in place.
    pub async fn reset_pending_many(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
    ) -> Result<(), sqlx::Error> {
        if source_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO migration_ledger (run_id, entity_type, source_id, status)
             SELECT $1, $2, unnest($3::text[]), $4
             ON CONFLICT (run_id, entity_type, source_id)
             DO UPDATE SET status = EXCLUDED.status, error_message = NULL, updated_at = NOW()",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_ids)
        .bind(EntryStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Upsert one row to `running`.
    pub async fn mark_running(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), sqlx::Error> {
        Self::upsert_status(pool, run_id, entity_type, source_id, EntryStatus::Running, None).await
    }

    /// Idempotent upsert to `success` with the record's target id and
    /// the payload that was sent.
    pub async fn set_success(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        target_id: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO migration_ledger
                (run_id, entity_type, source_id, status, target_id, payload, last_synced_at, sync_status)
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), 'synced')
             ON CONFLICT (run_id, entity_type, source_id)
             DO UPDATE SET status = EXCLUDED.status,
                           target_id = EXCLUDED.target_id,
                           payload = COALESCE(EXCLUDED.payload, migration_ledger.payload),
                           error_message = NULL,
                           last_synced_at = NOW(),
                           sync_status = 'synced',
                           updated_at = NOW()",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_id)
        .bind(EntryStatus::Success.as_str())
        .bind(target_id)
        .bind(payload)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Upsert one row to `failed` with a bounded error message.
    pub async fn mark_failed(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        let message = truncate_error(error);
        sqlx::query(
            "INSERT INTO migration_ledger (run_id, entity_type, source_id, status, error_message)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (run_id, entity_type, source_id)
             DO UPDATE SET status = EXCLUDED.status,
                           error_message = EXCLUDED.error_message,
                           updated_at = NOW()",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_id)
        .bind(EntryStatus::Failed.as_str())
        .bind(&message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Upsert one row to `skipped`, keeping the computed payload when
    /// provided (dry-run inspection).
    pub async fn mark_skipped(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        Self::upsert_status(pool, run_id, entity_type, source_id, EntryStatus::Skipped, payload)
            .await
    }

    /// Flag a row's sync bookkeeping as a manual-review conflict.
    pub async fn flag_conflict(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE migration_ledger SET sync_status = 'conflict', updated_at = NOW()
             WHERE run_id = $1 AND entity_type = $2 AND source_id = $3",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Bulk projection of all `success` rows for one entity type:
    /// source id → encoded target id.
    pub async fn get_map(
        pool: &PgPool,
        entity_type: EntityType,
        run_id: DbId,
    ) -> Result<HashMap<String, String>, sqlx::Error> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT source_id, target_id FROM migration_ledger
             WHERE run_id = $1 AND entity_type = $2 AND status = $3",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(EntryStatus::Success.as_str())
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(source, target)| target.map(|t| (source, t)))
            .collect())
    }

    /// All ledger entries for one entity type within a run, keyed by
    /// source id. Used by stage drivers for the delta decision pass.
    pub async fn entry_map(
        pool: &PgPool,
        entity_type: EntityType,
        run_id: DbId,
    ) -> Result<HashMap<String, LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM migration_ledger
             WHERE run_id = $1 AND entity_type = $2"
        );
        let rows = sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(run_id)
            .bind(entity_type.as_str())
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.source_id.clone(), r)).collect())
    }

    /// Mark every still-pending/running row in a batch as failed with
    /// the batch-level terminal error. Completed and skipped rows are
    /// untouched.
    pub async fn mark_batch_failed(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_ids: &[String],
        error: &str,
    ) -> Result<u64, sqlx::Error> {
        let message = truncate_error(error);
        let result = sqlx::query(
            "UPDATE migration_ledger
             SET status = $4, error_message = $5, updated_at = NOW()
             WHERE run_id = $1 AND entity_type = $2 AND source_id = ANY($3)
               AND status IN ($6, $7)",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_ids)
        .bind(EntryStatus::Failed.as_str())
        .bind(&message)
        .bind(EntryStatus::Pending.as_str())
        .bind(EntryStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Per-(entity_type, status) counts for one run, for the status
    /// report.
    pub async fn count_by_status(
        pool: &PgPool,
        run_id: DbId,
    ) -> Result<Vec<LedgerStatusCount>, sqlx::Error> {
        sqlx::query_as::<_, LedgerStatusCount>(
            "SELECT entity_type, status, COUNT(*) AS count FROM migration_ledger
             WHERE run_id = $1
             GROUP BY entity_type, status
             ORDER BY entity_type, status",
        )
        .bind(run_id)
        .fetch_all(pool)
        .await
    }

    /// List ledger entries for a run, optionally filtered by entity
    /// type, ordered by last update.
    pub async fn list_by_run(
        pool: &PgPool,
        run_id: DbId,
        entity_type: Option<EntityType>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM migration_ledger
             WHERE run_id = $1 AND ($2::text IS NULL OR entity_type = $2)
             ORDER BY updated_at DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(run_id)
            .bind(entity_type.map(|e| e.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Shared upsert for statuses that optionally carry a payload.
    async fn upsert_status(
        pool: &PgPool,
        run_id: DbId,
        entity_type: EntityType,
        source_id: &str,
        status: EntryStatus,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO migration_ledger (run_id, entity_type, source_id, status, payload)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (run_id, entity_type, source_id)
             DO UPDATE SET status = EXCLUDED.status,
                           payload = COALESCE(EXCLUDED.payload, migration_ledger.payload),
                           updated_at = NOW()",
        )
        .bind(run_id)
        .bind(entity_type.as_str())
        .bind(source_id)
        .bind(status.as_str())
        .bind(payload)
        .execute(pool)
        .await?;
        Ok(())
    }
}
