//! In-process object store and pair table.

use super::{ObjectStore, PairFilter, PairTable};
use crate::matcher::{image_name_matches, text_matches};
use crate::{AppError, ImageTextPair, MatchMode};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<(String, String), Vec<u8>>,
    rows: Vec<ImageTextPair>,
    uploads: usize,
}

/// Object store and table kept in memory; rows are returned in insert order.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::StorageMessage("Memory store lock poisoned".to_string()))
    }

    /// Number of objects currently stored across all buckets.
    pub fn object_count(&self) -> usize {
        self.lock().map(|state| state.objects.len()).unwrap_or(0)
    }

    /// Number of successful `upload_object` calls since creation.
    pub fn upload_count(&self) -> usize {
        self.lock().map(|state| state.uploads).unwrap_or(0)
    }

    /// Whether an object exists at `bucket/key`.
    pub fn contains_object(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .map(|state| {
                state
                    .objects
                    .contains_key(&(bucket.to_string(), key.to_string()))
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, AppError> {
        if key.trim().is_empty() || key.starts_with('/') {
            return Err(AppError::StorageMessage(format!(
                "Invalid object key '{}'",
                key
            )));
        }
        let mut state = self.lock()?;
        let slot = (bucket.to_string(), key.to_string());
        if state.objects.contains_key(&slot) {
            return Err(AppError::StorageMessage(format!(
                "Object already exists: {}/{}",
                bucket, key
            )));
        }
        state.objects.insert(slot, bytes);
        state.uploads += 1;
        Ok(key.to_string())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), AppError> {
        let mut state = self.lock()?;
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[async_trait]
impl PairTable for MemoryBackend {
    async fn insert(&self, pair: &ImageTextPair) -> Result<(), AppError> {
        self.lock()?.rows.push(pair.clone());
        Ok(())
    }

    async fn select(&self, filter: &PairFilter) -> Result<Vec<ImageTextPair>, AppError> {
        let state = self.lock()?;
        let rows = state
            .rows
            .iter()
            .filter(|row| match filter {
                PairFilter::All => true,
                PairFilter::TextEquals(text) => {
                    text_matches(MatchMode::Exact, &row.text_content, text)
                }
                PairFilter::TextEqualsIgnoreCase(text) => {
                    text_matches(MatchMode::CaseInsensitive, &row.text_content, text)
                }
                PairFilter::ImageUrlContains(fragment) => {
                    image_name_matches(&row.image_url, fragment)
                }
            })
            .cloned()
            .collect();
        Ok(rows)
    }
}
