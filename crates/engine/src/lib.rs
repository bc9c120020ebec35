//! Migration orchestration engine (MIG-08, MIG-10, MIG-13).
//!
//! Drives a claimed run through the fixed stage sequence: the pipeline
//! controller walks an ordered stage plan, each stage driver builds a
//! working set and fans it out into bounded concurrent batch units,
//! and every batch unit processes its ids one record at a time against
//! the ledger and the destination API.
//!
//! All side-effecting collaborators (source reads, transforms,
//! destination writes, ledger, run store, cancellation flags, audit
//! log) sit behind traits in [`collaborators`], so the orchestration
//! logic is testable with in-memory fakes and the Postgres/HTTP
//! implementations in [`pg`] stay thin.

pub mod batch;
pub mod collaborators;
pub mod control;
pub mod error;
pub mod pg;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod stage;

pub use collaborators::{
    AuditSink, CancelFlags, DestinationClient, Ledger, LedgerState, RunState, RunStore,
    SourceReader, StatusCount, Transformer,
};
pub use control::{RunReport, Stores};
pub use error::EngineError;
pub use pipeline::{execute_run, stage_plan, Engine, PipelineOptions};
pub use record::{EntityRef, ResolvedRefs, SourceRecord};
pub use registry::{EntityEndpoint, EntityHandler, EntityRegistry};
