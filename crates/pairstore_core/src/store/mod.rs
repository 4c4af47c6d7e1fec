//! Storage seams: an object store for image bytes and a table for pair rows.
//!
//! The hosted service provides both behind one base URL; the in-memory
//! backend provides both in-process. Callers go through
//! [`crate::PairStoreClient`] rather than using these traits directly.

/// REST backend for the hosted table + object storage service.
pub mod hosted;
/// In-process backend for local development and tests.
pub mod memory;

pub use hosted::HostedBackend;
pub use memory::MemoryBackend;

use crate::{AppError, ImageTextPair};
use async_trait::async_trait;

/// Row filter supported by every [`PairTable`].
///
/// Backends may return a superset of the matching rows; the client re-checks
/// each row with [`crate::matcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairFilter {
    All,
    TextEquals(String),
    TextEqualsIgnoreCase(String),
    ImageUrlContains(String),
}

impl PairFilter {
    /// Short label used in logs and timeout errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::All => "select all",
            Self::TextEquals(_) => "select text eq",
            Self::TextEqualsIgnoreCase(_) => "select text ilike",
            Self::ImageUrlContains(_) => "select image_url like",
        }
    }
}

/// Bucketed object storage for raw image bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` in `bucket` without overwriting.
    ///
    /// # Returns
    /// The object path relative to the bucket.
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError>;

    /// Remove the object at `key`. Removing a missing object is not an error.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), AppError>;
}

/// Append-only table of `(image_url, text_content)` rows.
#[async_trait]
pub trait PairTable: Send + Sync {
    async fn insert(&self, pair: &ImageTextPair) -> Result<(), AppError>;

    async fn select(&self, filter: &PairFilter) -> Result<Vec<ImageTextPair>, AppError>;
}
