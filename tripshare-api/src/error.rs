use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tripshare_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    ValidationError { field: String, message: String },
    NotFoundError(String),
    DuplicateJoin(String),
    CapacityExceeded(String),
    InternalServerError(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::AuthenticationError(_) => "UNAUTHORIZED",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::NotFoundError(_) => "NOT_FOUND",
            AppError::DuplicateJoin(_) => "DUPLICATE_JOIN",
            AppError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, body) = match self {
            AppError::AuthenticationError(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": kind, "message": msg }),
            ),
            AppError::ValidationError { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": kind, "message": message, "field": field }),
            ),
            AppError::NotFoundError(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "error": kind, "message": msg }),
            ),
            AppError::DuplicateJoin(msg) | AppError::CapacityExceeded(msg) => (
                StatusCode::CONFLICT,
                json!({ "error": kind, "message": msg }),
            ),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": kind, "message": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ValidationError { field, message } => {
                AppError::ValidationError { field, message }
            }
            CoreError::NotFound(msg) => AppError::NotFoundError(msg),
            CoreError::DuplicateJoin { .. } => AppError::DuplicateJoin(message),
            CoreError::CapacityExceeded { .. } => AppError::CapacityExceeded(message),
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}
