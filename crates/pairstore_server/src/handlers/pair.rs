//! Pair HTTP handlers: upload, listing and the check-image form.

use super::multipart::read_upload_form;
use super::normalize::normalize_optional;
use crate::{error::HttpError, AppError, AppState};
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use pairstore_core::duplicate::ImageMatchPolicy;
use pairstore_core::flow::UploadFlow;
use pairstore_core::models::pair::{CheckImageResponse, PairListing, UploadReceipt};
use pairstore_core::naming::{sanitize_file_name, stored_file_name};
use pairstore_core::upload::UploadRequest;

/// Header carrying the client-chosen idempotency key for uploads.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Upload an image and its text as one pair.
///
/// # Multipart Fields
/// - `file`: Image file (required)
/// - `text`: Text paired with the image (required)
///
/// # Returns
/// The committed upload receipt as JSON.
///
/// # Errors
/// 400 for missing inputs, 409 for duplicates, 502/504 for backend failures.
pub async fn create_pair(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UploadReceipt>, HttpError> {
    let idempotency_key = normalize_optional(
        headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    );
    let mut form = read_upload_form(multipart).await?;
    let text = form.text.take().unwrap_or_default();
    let file = form.file.take().unwrap_or_default();

    let mut flow = UploadFlow::new();
    let result = state
        .uploader
        .upload(
            &mut flow,
            UploadRequest {
                file_name: file.file_name,
                content_type: file.content_type,
                bytes: file.bytes,
                text,
                idempotency_key,
            },
        )
        .await;
    tracing::debug!(
        state = flow.state().name(),
        saga = ?flow.saga(),
        "upload request finished"
    );
    Ok(Json(result?))
}

/// List every stored pair.
///
/// # Returns
/// A listing with an explicit empty-state message when nothing is stored.
pub async fn list_pairs(State(state): State<AppState>) -> Result<Json<PairListing>, HttpError> {
    let pairs = state.client.list_all().await?;
    Ok(Json(PairListing::from(pairs)))
}

/// Look up the text stored for an uploaded image's file name.
///
/// Under the exact-name policy only rows whose stored file name equals the
/// upload's sanitized name count; the substring policy accepts every URL
/// containing it.
///
/// # Errors
/// 404 when no stored image matches.
pub async fn check_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CheckImageResponse>, HttpError> {
    let mut form = read_upload_form(multipart).await?;
    let file = form.require_file()?;
    let file_name = sanitize_file_name(&file.file_name);

    let mut rows = state
        .client
        .find_by_image_name_substring(&file_name)
        .await?;
    if state.config.duplicate_image_match == ImageMatchPolicy::ExactName {
        let scheme = state.config.key_scheme;
        rows.retain(|row| stored_file_name(&row.image_url, scheme) == file_name);
    }
    let matches = rows.len();
    let first = rows.into_iter().next().ok_or(AppError::NotFound)?;
    Ok(Json(CheckImageResponse {
        file_name,
        text_content: first.text_content,
        matches,
    }))
}
