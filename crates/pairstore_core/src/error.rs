//! Application error types for pair storage and domain logic.
use std::time::Duration;
use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed image/text input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An image with the same file name is already stored.
    #[error("Duplicate image: {0}")]
    DuplicateImage(String),

    /// A pair with exactly this text is already stored.
    #[error("Duplicate text: {0}")]
    DuplicateText(String),

    /// The request collides with one still being processed.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object upload/delete or table operation failed at the backend.
    #[error("Storage error: {0}")]
    StorageMessage(String),

    #[error("Storage timeout: {operation} did not finish within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Not found")]
    NotFound,

    /// A single-row lookup matched more than one stored pair.
    #[error("Lookup matched {0} pairs, expected at most one")]
    MultipleMatches(usize),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Stable snake_case identifier used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicateImage(_) => "duplicate_image",
            Self::DuplicateText(_) => "duplicate_text",
            Self::Conflict(_) => "conflict",
            Self::StorageMessage(_) => "storage",
            Self::Timeout { .. } => "timeout",
            Self::NotFound => "not_found",
            Self::MultipleMatches(_) => "multiple_matches",
            Self::Internal => "internal",
        }
    }

    /// Whether the error originated in the backend rather than the request.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageMessage(_) | Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::StorageMessage(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::StorageMessage(format!("Malformed backend response: {}", value))
    }
}
