//! Image/text pair entity and the request/response payloads built around it.

use crate::{url::normalize_public_url, AppError, EMPTY_LISTING_MESSAGE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stored `(image, text)` association.
///
/// Field names match the hosted table columns so rows deserialize directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTextPair {
    pub image_url: String,
    pub text_content: String,
}

impl ImageTextPair {
    /// Create a validated pair.
    ///
    /// # Arguments
    /// - `image_url`: Public URL of the stored image.
    /// - `text_content`: Caption associated with the image.
    ///
    /// # Returns
    /// A pair whose URL has been normalized.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] when either field is empty or blank.
    pub fn new(image_url: impl Into<String>, text_content: impl Into<String>) -> Result<Self, AppError> {
        let image_url = image_url.into();
        let text_content = text_content.into();
        if image_url.trim().is_empty() {
            return Err(AppError::Validation("image_url must not be empty".to_string()));
        }
        if text_content.trim().is_empty() {
            return Err(AppError::Validation(
                "text_content must not be empty".to_string(),
            ));
        }
        Ok(Self {
            image_url: normalize_public_url(&image_url),
            text_content,
        })
    }

    /// Return the pair with its URL normalized.
    ///
    /// Rows read back from the table may predate normalization.
    pub fn normalized(mut self) -> Self {
        self.image_url = normalize_public_url(&self.image_url);
        self
    }
}

/// Text lookup strategy chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-sensitive whole-string equality.
    Exact,
    /// Whole-string equality after case folding.
    #[default]
    #[serde(alias = "case-insensitive")]
    CaseInsensitive,
}

impl MatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::CaseInsensitive => "case_insensitive",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" | "eq" => Ok(Self::Exact),
            "case_insensitive" | "case-insensitive" | "insensitive" | "ilike" => {
                Ok(Self::CaseInsensitive)
            }
            other => Err(format!(
                "unknown match mode '{}'; expected 'exact' or 'case_insensitive'",
                other
            )),
        }
    }
}

/// Saga status of an upload: the object exists before its row does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    /// Object uploaded, row not yet inserted.
    Pending,
    /// Object and row both stored.
    Committed,
    /// Row insert failed and the object was deleted again.
    RolledBack,
}

/// Query parameters for the image-from-text lookup.
#[derive(Debug, Deserialize)]
pub struct TextLookupQuery {
    #[serde(default)]
    pub text: String,
    pub mode: Option<MatchMode>,
}

/// Query parameters for the text-from-image lookup.
#[derive(Debug, Deserialize)]
pub struct ImageLookupQuery {
    #[serde(default)]
    pub name: String,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub pair: ImageTextPair,
    /// Object path relative to the bucket.
    pub object_path: String,
    pub status: SagaStatus,
}

/// Response for the check-image flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckImageResponse {
    pub file_name: String,
    pub text_content: String,
    pub matches: usize,
}

/// All stored pairs, with an explicit "no results" state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairListing {
    pub items: Vec<ImageTextPair>,
    pub total: usize,
    pub empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Vec<ImageTextPair>> for PairListing {
    fn from(items: Vec<ImageTextPair>) -> Self {
        let total = items.len();
        let empty = items.is_empty();
        Self {
            items,
            total,
            empty,
            message: empty.then(|| EMPTY_LISTING_MESSAGE.to_string()),
        }
    }
}
