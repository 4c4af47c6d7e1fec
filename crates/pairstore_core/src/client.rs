//! Pair Store Client: the single entry point for create/lookup/list.
//!
//! The client is constructed explicitly and passed to whoever needs it; there
//! is no process-global handle. Every backend call is bounded by the
//! configured timeout, every returned row is re-checked against the canonical
//! matchers and every returned URL is normalized.

use crate::config::BackendKind;
use crate::matcher::{image_name_matches, text_matches};
use crate::store::{HostedBackend, MemoryBackend, ObjectStore, PairFilter, PairTable};
use crate::url::public_object_url;
use crate::{AppError, Config, ImageTextPair, MatchMode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Client over an object store and a pair table.
#[derive(Clone)]
pub struct PairStoreClient {
    objects: Arc<dyn ObjectStore>,
    table: Arc<dyn PairTable>,
    bucket: String,
    public_base: String,
    timeout: Duration,
}

impl PairStoreClient {
    /// Construct a client from separate object store and table backends.
    ///
    /// # Arguments
    /// - `objects`: Object storage for image bytes.
    /// - `table`: Row storage for pairs.
    /// - `bucket`: Bucket uploads go to.
    /// - `public_base`: Base URL public object URLs are built from.
    /// - `timeout`: Upper bound for each backend call.
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        table: Arc<dyn PairTable>,
        bucket: impl Into<String>,
        public_base: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            objects,
            table,
            bucket: bucket.into(),
            public_base: public_base.into(),
            timeout,
        }
    }

    /// Construct a client over one backend that provides both seams.
    pub fn with_backend<B>(
        backend: Arc<B>,
        bucket: impl Into<String>,
        public_base: impl Into<String>,
        timeout: Duration,
    ) -> Self
    where
        B: ObjectStore + PairTable + 'static,
    {
        let objects: Arc<dyn ObjectStore> = backend.clone();
        let table: Arc<dyn PairTable> = backend;
        Self::new(objects, table, bucket, public_base, timeout)
    }

    /// Build the backend selected by `config` and wrap it in a client.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] for incomplete hosted configuration.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        config.validate()?;
        let client = match config.backend {
            BackendKind::Hosted => {
                let backend = Arc::new(HostedBackend::from_config(config)?);
                let public_base = backend.base_url().to_string();
                Self::with_backend(backend, &config.bucket, public_base, config.request_timeout())
            }
            BackendKind::Memory => Self::with_backend(
                Arc::new(MemoryBackend::new()),
                &config.bucket,
                config.public_base_url(),
                config.request_timeout(),
            ),
        };
        Ok(client)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Public read URL for an object path in this client's bucket.
    pub fn public_url(&self, object_path: &str) -> String {
        public_object_url(&self.public_base, &self.bucket, object_path)
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }

    /// Store raw bytes under `key` in `bucket`.
    ///
    /// # Returns
    /// The stored object path relative to the bucket.
    ///
    /// # Errors
    /// [`AppError::StorageMessage`] on backend failure (quota, network,
    /// invalid or existing key), [`AppError::Timeout`] when the call hangs.
    pub async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let size = bytes.len();
        let path = self
            .timed(
                "upload object",
                self.objects.upload_object(bucket, key, bytes, content_type),
            )
            .await?;
        debug!(bucket, key, size, object_path = %path, "pair store: uploaded object");
        Ok(path)
    }

    /// Remove an object; used to compensate a failed insert.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), AppError> {
        self.timed("delete object", self.objects.delete_object(bucket, key))
            .await?;
        debug!(bucket, key, "pair store: deleted object");
        Ok(())
    }

    /// Append a pair row.
    ///
    /// # Errors
    /// [`AppError::Validation`] for blank fields, otherwise backend errors.
    pub async fn insert_pair(&self, pair: &ImageTextPair) -> Result<(), AppError> {
        let pair = ImageTextPair::new(pair.image_url.as_str(), pair.text_content.as_str())?;
        self.timed("insert pair", self.table.insert(&pair)).await?;
        debug!(image_url = %pair.image_url, "pair store: inserted pair");
        Ok(())
    }

    async fn select(&self, filter: PairFilter) -> Result<Vec<ImageTextPair>, AppError> {
        let rows = self
            .timed(filter.operation(), self.table.select(&filter))
            .await?;
        debug!(operation = filter.operation(), rows = rows.len(), "pair store: select");
        Ok(rows.into_iter().map(ImageTextPair::normalized).collect())
    }

    /// Every stored pair whose text matches `text` under `mode`.
    pub async fn find_all_by_text(
        &self,
        text: &str,
        mode: MatchMode,
    ) -> Result<Vec<ImageTextPair>, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("text must not be empty".to_string()));
        }
        let filter = match mode {
            MatchMode::Exact => PairFilter::TextEquals(text.to_string()),
            MatchMode::CaseInsensitive => PairFilter::TextEqualsIgnoreCase(text.to_string()),
        };
        let rows = self.select(filter).await?;
        Ok(rows
            .into_iter()
            .filter(|row| text_matches(mode, &row.text_content, text))
            .collect())
    }

    /// Single-row text lookup.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when nothing matches,
    /// [`AppError::MultipleMatches`] when more than one pair does.
    pub async fn find_by_text(&self, text: &str, mode: MatchMode) -> Result<ImageTextPair, AppError> {
        let mut rows = self.find_all_by_text(text, mode).await?;
        match rows.len() {
            0 => Err(AppError::NotFound),
            1 => Ok(rows.remove(0)),
            count => Err(AppError::MultipleMatches(count)),
        }
    }

    pub async fn find_by_text_exact(&self, text: &str) -> Result<ImageTextPair, AppError> {
        self.find_by_text(text, MatchMode::Exact).await
    }

    pub async fn find_by_text_case_insensitive(
        &self,
        text: &str,
    ) -> Result<ImageTextPair, AppError> {
        self.find_by_text(text, MatchMode::CaseInsensitive).await
    }

    /// Pairs whose image URL contains `fragment` anywhere.
    ///
    /// Collision-prone by nature: unrelated files sharing a substring match
    /// too.
    pub async fn find_by_image_name_substring(
        &self,
        fragment: &str,
    ) -> Result<Vec<ImageTextPair>, AppError> {
        if fragment.trim().is_empty() {
            return Err(AppError::Validation(
                "image name must not be empty".to_string(),
            ));
        }
        let rows = self
            .select(PairFilter::ImageUrlContains(fragment.to_string()))
            .await?;
        Ok(rows
            .into_iter()
            .filter(|row| image_name_matches(&row.image_url, fragment))
            .collect())
    }

    /// Every stored pair, unpaginated.
    pub async fn list_all(&self) -> Result<Vec<ImageTextPair>, AppError> {
        self.select(PairFilter::All).await
    }
}
