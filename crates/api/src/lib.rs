//! HTTP API for the storebridge migration service.
//!
//! Exposes run CRUD and lifecycle control (start, pause, resume,
//! cancel), the aggregated status report, and the ledger/audit query
//! surface. The API never drives the pipeline itself; it mutates
//! lifecycle state that worker processes poll and claim.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
