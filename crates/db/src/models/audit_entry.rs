//! Audit log models (MIG-11).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storebridge_core::types::{DbId, Timestamp};

/// A row from the append-only `audit_log` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEntry {
    pub id: DbId,
    pub run_id: DbId,
    pub entity_type: Option<String>,
    pub source_id: Option<String>,
    pub severity: String,
    pub message: String,
    pub created_at: Timestamp,
}

/// DTO for appending an audit log entry.
#[derive(Debug, Deserialize)]
pub struct CreateAuditEntry {
    pub run_id: DbId,
    pub entity_type: Option<String>,
    pub source_id: Option<String>,
    pub severity: String,
    pub message: String,
}
