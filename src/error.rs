use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for the matching and lifecycle operations. Every variant
/// is recoverable at the call boundary; handlers surface them as 4xx/5xx.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} is {current}, cannot {action}")]
    InvalidState {
        entity: &'static str,
        current: String,
        action: String,
    },

    #[error("{field}: {constraint}")]
    Validation {
        field: &'static str,
        constraint: String,
    },

    #[error("{0}")]
    Authorization(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidState { .. } => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("DB Error: {}", self);
        }
        let body = match &self {
            AppError::NotFound { .. } => json!({ "error": "not_found", "detail": self.to_string() }),
            AppError::InvalidState { entity, current, action } => json!({
                "error": "invalid_state",
                "entity": entity,
                "current": current,
                "action": action,
            }),
            AppError::Validation { field, constraint } => json!({
                "error": "validation",
                "field": field,
                "constraint": constraint,
            }),
            AppError::Authorization(_) => json!({ "error": "forbidden", "detail": self.to_string() }),
            AppError::Database(_) | AppError::Pool(_) => json!({ "error": "internal", "detail": "Database Error" }),
        };
        (status, Json(body)).into_response()
    }
}
