use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("this time slot is not available")]
    SlotUnavailable,

    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failure: {0}")]
    Validation(String),

    #[error("payment provider error: {0}")]
    Payment(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Persistence failures are logged for operators and surfaced as a
        // generic 500 without internal detail.
        let (status, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::SlotUnavailable => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidInterval(_)
            | AppError::CapacityExceeded(_)
            | AppError::InvalidTransition(_)
            | AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Payment(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}
