//! Source record shape shared by readers and transformers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use storebridge_core::entity::EntityType;
use storebridge_core::ledger::TargetId;
use storebridge_core::types::Timestamp;

/// One record as read from the source store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Stable identifier within the source store.
    pub source_id: String,
    /// Source-side modification timestamp, when the source tracks one.
    /// Records without one are always treated as possibly changed.
    pub updated_at: Option<Timestamp>,
    /// Raw record data, in the source's own shape.
    pub data: serde_json::Value,
    /// Cross-entity references this record carries. Resolved against
    /// earlier stages' ledger rows before transforming.
    #[serde(default)]
    pub references: Vec<EntityRef>,
}

impl SourceRecord {
    /// A record with no timestamp and no references.
    pub fn new(source_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            source_id: source_id.into(),
            updated_at: None,
            data,
            references: Vec::new(),
        }
    }
}

/// A reference from one record to a record of an earlier stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub source_id: String,
    /// The payload field the resolved target id feeds.
    pub field: String,
}

/// Resolved references, keyed by payload field. References whose
/// target has not been migrated are absent, never erroneous.
pub type ResolvedRefs = HashMap<String, TargetId>;
