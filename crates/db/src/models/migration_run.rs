//! Migration run model (MIG-04).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storebridge_core::types::{DbId, Timestamp};

/// A row from the `migration_runs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MigrationRun {
    pub id: DbId,
    pub name: String,
    /// Source store connection settings; opaque to the engine, passed
    /// to the source-reader collaborators.
    pub source_config: serde_json::Value,
    /// Destination API connection settings; opaque to the engine.
    pub destination_config: serde_json::Value,
    pub is_dry_run: bool,
    pub sync_mode: String,
    pub conflict_strategy: String,
    pub status: String,
    /// Set when the run is enqueued for a worker to claim.
    pub queued_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    /// Delta high-water mark. Advanced per stage, never rewound.
    pub last_sync_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new migration run.
#[derive(Debug, Deserialize)]
pub struct CreateMigrationRun {
    pub name: String,
    pub source_config: serde_json::Value,
    pub destination_config: serde_json::Value,
    #[serde(default)]
    pub is_dry_run: bool,
    pub sync_mode: String,
    pub conflict_strategy: String,
}
