//! Engine error type.
//!
//! Collaborator traits erase their backend-specific errors into these
//! variants so in-memory test doubles and the Postgres/HTTP
//! implementations share one signature.

use storebridge_core::entity::EntityType;
use storebridge_core::run::RunStatus;
use storebridge_core::types::DbId;

/// Errors surfaced by the orchestration engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A ledger, run-store, flag, or audit operation failed.
    #[error("store error: {0}")]
    Store(String),

    /// Reading from the source store failed.
    #[error("source read failed: {0}")]
    Source(String),

    /// A destination API request was rejected for this record.
    #[error("destination request failed: {0}")]
    Destination(String),

    /// The destination record a request targeted no longer exists.
    #[error("destination record missing: {0}")]
    DestinationMissing(String),

    /// The destination API is unreachable or transiently failing.
    /// Escalates past per-record absorption into the batch retry path.
    #[error("destination unavailable: {0}")]
    DestinationUnavailable(String),

    /// Transforming a source record into the destination shape failed.
    #[error("transform failed: {0}")]
    Transform(String),

    /// A working-set id vanished from the source between selection and
    /// processing.
    #[error("record {source_id} not found in source store")]
    SourceRecordMissing { source_id: String },

    /// No handler is registered for this entity type.
    #[error("no handler registered for entity type {0}")]
    UnregisteredEntity(EntityType),

    #[error("run {0} not found")]
    RunNotFound(DbId),

    /// A control operation found the run in the wrong lifecycle state.
    #[error("run {run_id} is {status}, expected {expected}")]
    InvalidRunState {
        run_id: DbId,
        status: RunStatus,
        expected: RunStatus,
    },

    /// The run's cancellation flag is raised.
    #[error("run cancelled")]
    Cancelled,

    /// A batch attempt exceeded its per-entity-type deadline.
    #[error("batch timed out after {0} seconds")]
    BatchTimeout(u64),

    #[error("{0}")]
    Invalid(String),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<storebridge_shopware::ApiError> for EngineError {
    fn from(err: storebridge_shopware::ApiError) -> Self {
        if err.is_transient() {
            Self::DestinationUnavailable(err.to_string())
        } else if err.is_not_found() {
            Self::DestinationMissing(err.to_string())
        } else {
            Self::Destination(err.to_string())
        }
    }
}
