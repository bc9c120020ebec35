//! Handlers for the per-run audit log.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use storebridge_core::audit::Severity;
use storebridge_core::types::DbId;
use storebridge_db::models::audit_entry::AuditEntry;
use storebridge_db::repositories::AuditRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::runs::find_run;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub severity: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /runs/{id}/audit
pub async fn list_audit(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<Vec<AuditEntry>>>> {
    find_run(&state, id).await?;
    let severity = match query.severity.as_deref() {
        Some(raw) => Some(
            Severity::from_str(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown severity: {raw}")))?
                .as_str(),
        ),
        None => None,
    };
    let entries =
        AuditRepo::list_by_run(&state.pool, id, severity, query.limit, query.offset).await?;
    Ok(Json(DataResponse { data: entries }))
}
