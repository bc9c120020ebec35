//! Cancellation flag model (MIG-05).

use serde::Serialize;
use sqlx::FromRow;
use storebridge_core::types::{DbId, Timestamp};

/// A row from the `cancellation_flags` table.
///
/// An advisory, TTL'd per-run boolean polled cooperatively by stage
/// drivers and batch units. Not a hard kill switch.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CancellationFlag {
    pub run_id: DbId,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}
