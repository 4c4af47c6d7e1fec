//! HTTP error mapping for API handlers.

use crate::AppError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Wrapper that turns an [`AppError`] into a JSON error response.
#[derive(Debug)]
pub struct HttpError(pub AppError);

impl HttpError {
    /// Status code reported for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateImage(_)
            | AppError::DuplicateText(_)
            | AppError::Conflict(_)
            | AppError::MultipleMatches(_) => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::StorageMessage(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            AppError::NotFound => "Not found".to_string(),
            AppError::Validation(msg)
            | AppError::DuplicateImage(msg)
            | AppError::DuplicateText(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::StorageMessage(msg) => {
                tracing::warn!("Storage error: {}", msg);
                msg.clone()
            }
            other @ AppError::Timeout { .. } => {
                tracing::warn!("{}", other);
                other.to_string()
            }
            other @ AppError::MultipleMatches(_) => other.to_string(),
            AppError::Internal => {
                tracing::error!("Internal error while handling request");
                "Internal server error".to_string()
            }
        };
        let body = Json(json!({ "error": message, "kind": self.0.kind() }));
        (status, body).into_response()
    }
}
