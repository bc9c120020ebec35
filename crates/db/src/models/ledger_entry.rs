//! Entity ledger models (MIG-07).

use serde::Serialize;
use sqlx::FromRow;
use storebridge_core::types::{DbId, Timestamp};

/// A row from the `migration_ledger` table.
///
/// One row per (run, entity_type, source_id); the system's source of
/// truth for idempotency and cross-entity reference resolution.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerEntry {
    pub id: DbId,
    pub run_id: DbId,
    pub entity_type: String,
    pub source_id: String,
    pub status: String,
    /// Encoded target id; `virtual:`-prefixed for synthetic keys.
    pub target_id: Option<String>,
    /// Last computed destination-shape payload (dry-run inspection).
    pub payload: Option<serde_json::Value>,
    pub error_message: Option<String>,
    /// Modification timestamp of the destination record, when known.
    pub shopware_updated_at: Option<Timestamp>,
    pub last_synced_at: Option<Timestamp>,
    /// Delta/conflict bookkeeping (`synced`, `conflict`).
    pub sync_status: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Per-(entity_type, status) row count for one run.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerStatusCount {
    pub entity_type: String,
    pub status: String,
    pub count: i64,
}
