//! Repository for the append-only `audit_log` table (MIG-11).

use sqlx::PgPool;
use storebridge_core::types::DbId;

use crate::models::audit_entry::{AuditEntry, CreateAuditEntry};

/// Column list for audit_log queries.
const COLUMNS: &str = "id, run_id, entity_type, source_id, severity, message, created_at";

/// Maximum page size for audit listing.
const MAX_LIMIT: i64 = 500;

/// Default page size for audit listing.
const DEFAULT_LIMIT: i64 = 100;

/// Provides append and query operations for audit log entries.
pub struct AuditRepo;

impl AuditRepo {
    /// Append an audit entry, returning the created row.
    pub async fn append(
        pool: &PgPool,
        input: &CreateAuditEntry,
    ) -> Result<AuditEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_log (run_id, entity_type, source_id, severity, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(input.run_id)
            .bind(&input.entity_type)
            .bind(&input.source_id)
            .bind(&input.severity)
            .bind(&input.message)
            .fetch_one(pool)
            .await
    }

    /// List audit entries for a run, newest first, optionally filtered
    /// by severity.
    pub async fn list_by_run(
        pool: &PgPool,
        run_id: DbId,
        severity: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM audit_log
             WHERE run_id = $1 AND ($2::text IS NULL OR severity = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, AuditEntry>(&query)
            .bind(run_id)
            .bind(severity)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count audit entries for a run and entity type. Used by batch
    /// failure tests and reporting.
    pub async fn count_for_entity(
        pool: &PgPool,
        run_id: DbId,
        entity_type: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM audit_log WHERE run_id = $1 AND entity_type = $2",
        )
        .bind(run_id)
        .bind(entity_type)
        .fetch_one(pool)
        .await
    }
}
