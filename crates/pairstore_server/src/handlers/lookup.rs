//! Lookup HTTP handlers.

use super::normalize::require_param;
use crate::{error::HttpError, AppError, AppState};
use axum::{
    extract::{Query, State},
    Json,
};
use pairstore_core::models::pair::{ImageLookupQuery, TextLookupQuery};
use pairstore_core::ImageTextPair;

/// Find the image paired with a text.
///
/// `mode` defaults to the server's configured lookup match.
///
/// # Errors
/// 404 when nothing matches, 409 when more than one pair matches.
pub async fn image_from_text(
    State(state): State<AppState>,
    Query(query): Query<TextLookupQuery>,
) -> Result<Json<ImageTextPair>, HttpError> {
    let text = require_param(&query.text, "text")?;
    let mode = query.mode.unwrap_or(state.config.lookup_match);
    let pair = state.client.find_by_text(text, mode).await?;
    Ok(Json(pair))
}

/// Find the pairs whose image URL contains a file name.
///
/// # Errors
/// 404 when no stored image URL contains `name`.
pub async fn text_from_image(
    State(state): State<AppState>,
    Query(query): Query<ImageLookupQuery>,
) -> Result<Json<Vec<ImageTextPair>>, HttpError> {
    let name = require_param(&query.name, "name")?;
    let rows = state
        .client
        .find_by_image_name_substring(name.trim())
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound.into());
    }
    Ok(Json(rows))
}
