//! Handlers for migration run CRUD, lifecycle control, and the
//! status/ledger observability surface.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use storebridge_core::entity::EntityType;
use storebridge_core::error::CoreError;
use storebridge_core::run::{validate_run_name, ConflictStrategy, SyncMode};
use storebridge_core::types::DbId;
use storebridge_db::models::ledger_entry::LedgerEntry;
use storebridge_db::models::migration_run::{CreateMigrationRun, MigrationRun};
use storebridge_db::repositories::{LedgerRepo, RunRepo};
use storebridge_engine::RunReport;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub entity_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /runs
pub async fn create_run(
    State(state): State<AppState>,
    Json(input): Json<CreateMigrationRun>,
) -> AppResult<(StatusCode, Json<DataResponse<MigrationRun>>)> {
    validate_run_name(&input.name).map_err(AppError::BadRequest)?;
    if SyncMode::from_str(&input.sync_mode).is_none() {
        return Err(AppError::BadRequest(format!(
            "unknown sync mode: {}",
            input.sync_mode
        )));
    }
    if ConflictStrategy::from_str(&input.conflict_strategy).is_none() {
        return Err(AppError::BadRequest(format!(
            "unknown conflict strategy: {}",
            input.conflict_strategy
        )));
    }

    let run = RunRepo::create(&state.pool, &input).await?;
    tracing::info!(run_id = run.id, name = %run.name, "migration run created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: run })))
}

/// GET /runs
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<DataResponse<Vec<MigrationRun>>>> {
    let runs = RunRepo::list(&state.pool, query.limit, query.offset).await?;
    Ok(Json(DataResponse { data: runs }))
}

/// GET /runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MigrationRun>>> {
    let run = find_run(&state, id).await?;
    Ok(Json(DataResponse { data: run }))
}

/// POST /runs/{id}/start
pub async fn start_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MigrationRun>>> {
    state.stores.start_run(id).await?;
    let run = find_run(&state, id).await?;
    Ok(Json(DataResponse { data: run }))
}

/// POST /runs/{id}/pause
pub async fn pause_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MigrationRun>>> {
    state.stores.pause_run(id).await?;
    let run = find_run(&state, id).await?;
    Ok(Json(DataResponse { data: run }))
}

/// POST /runs/{id}/resume
pub async fn resume_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MigrationRun>>> {
    state.stores.resume_run(id).await?;
    let run = find_run(&state, id).await?;
    Ok(Json(DataResponse { data: run }))
}

/// POST /runs/{id}/cancel
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MigrationRun>>> {
    state.stores.cancel_run(id).await?;
    let run = find_run(&state, id).await?;
    Ok(Json(DataResponse { data: run }))
}

/// GET /runs/{id}/status
pub async fn run_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RunReport>>> {
    let report = state.stores.status_report(id).await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /runs/{id}/ledger
pub async fn list_ledger(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<DataResponse<Vec<LedgerEntry>>>> {
    find_run(&state, id).await?;
    let entity_type = match query.entity_type.as_deref() {
        Some(raw) => Some(EntityType::from_str(raw).ok_or_else(|| {
            AppError::BadRequest(format!("unknown entity type: {raw}"))
        })?),
        None => None,
    };
    let entries =
        LedgerRepo::list_by_run(&state.pool, id, entity_type, query.limit, query.offset).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// Fetch a run or produce a 404.
pub(crate) async fn find_run(state: &AppState, id: DbId) -> AppResult<MigrationRun> {
    RunRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "migration run",
            id,
        }))
}
