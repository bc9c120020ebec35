//! API error type and HTTP mapping.
//!
//! Handlers return `AppResult<T>`; every error variant carries enough
//! context to produce a stable JSON error body without leaking
//! internals to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use storebridge_core::error::CoreError;
use storebridge_engine::EngineError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Core(e) => match e {
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::Conflict(_) | CoreError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                CoreError::Cancelled => StatusCode::CONFLICT,
                CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Engine(e) => match e {
                EngineError::RunNotFound(_) => StatusCode::NOT_FOUND,
                EngineError::InvalidRunState { .. } => StatusCode::CONFLICT,
                EngineError::Invalid(_) => StatusCode::BAD_REQUEST,
                EngineError::Cancelled => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Database(e) => classify_sqlx_error(e),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            return match self {
                AppError::Database(_) => "internal database error".into(),
                _ => "internal server error".into(),
            };
        }
        match self {
            AppError::Database(e) => match classify_sqlx_error(e) {
                StatusCode::NOT_FOUND => "resource not found".into(),
                StatusCode::CONFLICT => "resource already exists".into(),
                _ => "internal database error".into(),
            },
            other => other.to_string(),
        }
    }
}

/// Map database errors onto HTTP status codes.
///
/// Unique violations (23505) become 409s so that duplicate run names
/// surface as a client error rather than a 500.
fn classify_sqlx_error(err: &sqlx::Error) -> StatusCode {
    match err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) => {
            if db.code().as_deref() == Some("23505") {
                StatusCode::CONFLICT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }
        let body = json!({ "error": { "message": self.public_message() } });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storebridge_core::run::RunStatus;

    #[test]
    fn core_not_found_maps_to_404() {
        let err = AppError::Core(CoreError::NotFound {
            entity: "migration run",
            id: 42,
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_transition_maps_to_409() {
        let err = AppError::Engine(EngineError::InvalidRunState {
            run_id: 1,
            status: RunStatus::Completed,
            expected: RunStatus::Running,
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_invalid_maps_to_400() {
        let err = AppError::Engine(EngineError::Invalid("bad input".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_hides_details() {
        let err = AppError::InternalError("pool exhausted at 10/10".into());
        assert_eq!(err.public_message(), "internal server error");
    }
}
