//! Shared normalization helpers for optional string request fields.

use crate::AppError;

/// Normalize optional request values.
///
/// Empty or whitespace-only values are treated as absent.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Reject a blank parameter; the value itself is returned untrimmed.
pub(crate) fn require_param<'a>(value: &'a str, name: &str) -> Result<&'a str, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{}' is required", name)));
    }
    Ok(value)
}
