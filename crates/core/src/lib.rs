//! Pure domain types and decision logic for the storebridge migration
//! engine.
//!
//! This crate has zero I/O dependencies (no DB, no HTTP, no async). It
//! holds the entity-type catalog and stage ordering, run lifecycle
//! enums, ledger status and target-id types, and the delta/conflict
//! decision functions. Everything here is unit-testable with injected
//! values.

pub mod audit;
pub mod entity;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod run;
pub mod types;
