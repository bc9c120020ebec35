//! Route table for the migration-run surface.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/runs",
            get(handlers::runs::list_runs).post(handlers::runs::create_run),
        )
        .route("/runs/{id}", get(handlers::runs::get_run))
        .route("/runs/{id}/start", post(handlers::runs::start_run))
        .route("/runs/{id}/pause", post(handlers::runs::pause_run))
        .route("/runs/{id}/resume", post(handlers::runs::resume_run))
        .route("/runs/{id}/cancel", post(handlers::runs::cancel_run))
        .route("/runs/{id}/status", get(handlers::runs::run_status))
        .route("/runs/{id}/ledger", get(handlers::runs::list_ledger))
        .route("/runs/{id}/audit", get(handlers::audit::list_audit))
}
