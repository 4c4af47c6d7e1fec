//! Upload saga: validate, check duplicates, upload the object, insert the row.
//!
//! The object store and the table share no transaction. The object is
//! uploaded first and the row inserted second; when the insert fails the
//! object is deleted again so no orphan is left behind. Once the object is
//! stored, the insert and its compensation run on their own task, so a
//! caller that goes away mid-request still leaves the store consistent.

use crate::duplicate::{DuplicateChecker, ImageMatchPolicy};
use crate::flow::{RejectReason, UploadFlow};
use crate::models::pair::{SagaStatus, UploadReceipt};
use crate::naming::{object_key, KeyScheme};
use crate::{
    AppError, Config, ImageTextPair, PairStoreClient, DEFAULT_IDEMPOTENCY_CAPACITY,
    DEFAULT_IDEMPOTENCY_TTL_SECS,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// One upload submission.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_name: String,
    /// Client-declared MIME type; guessed from the extension when absent.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub text: String,
    /// Replaying a committed key returns the first receipt unchanged.
    pub idempotency_key: Option<String>,
}

enum IdempotencyEntry {
    InProgress,
    Committed { receipt: UploadReceipt, at: Instant },
}

/// Idempotency keys seen by this process, bounded by age and count.
struct IdempotencyLedger {
    entries: HashMap<String, IdempotencyEntry>,
    capacity: usize,
    ttl: Duration,
}

impl IdempotencyLedger {
    fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Mark `key` in progress, or return the receipt it already committed.
    ///
    /// # Errors
    /// [`AppError::Conflict`] while another upload holds the key.
    fn reserve(&mut self, key: &str, now: Instant) -> Result<Option<UploadReceipt>, AppError> {
        self.prune(now);
        match self.entries.get(key) {
            Some(IdempotencyEntry::Committed { receipt, .. }) => return Ok(Some(receipt.clone())),
            Some(IdempotencyEntry::InProgress) => {
                return Err(AppError::Conflict(
                    "An upload with this idempotency key is already in progress".to_string(),
                ));
            }
            None => {}
        }
        self.make_room();
        self.entries
            .insert(key.to_string(), IdempotencyEntry::InProgress);
        Ok(None)
    }

    fn commit(&mut self, key: String, receipt: UploadReceipt, now: Instant) {
        self.entries
            .insert(key, IdempotencyEntry::Committed { receipt, at: now });
    }

    fn release(&mut self, key: &str) {
        if matches!(self.entries.get(key), Some(IdempotencyEntry::InProgress)) {
            self.entries.remove(key);
        }
    }

    fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| match entry {
            IdempotencyEntry::InProgress => true,
            IdempotencyEntry::Committed { at, .. } => now.saturating_duration_since(*at) < ttl,
        });
    }

    /// Evict the oldest committed keys until one more entry fits.
    /// In-progress keys are never evicted.
    fn make_room(&mut self) {
        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .filter_map(|(key, entry)| match entry {
                    IdempotencyEntry::Committed { at, .. } => Some((key, *at)),
                    IdempotencyEntry::InProgress => None,
                })
                .min_by_key(|(_, at)| *at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// An idempotency key held in progress for one submission.
///
/// Dropping the reservation without committing frees the key, including
/// when the owning request future is cancelled.
struct KeyReservation {
    ledger: Arc<Mutex<IdempotencyLedger>>,
    key: Option<String>,
}

impl KeyReservation {
    fn commit(mut self, receipt: &UploadReceipt) {
        let Some(key) = self.key.take() else {
            return;
        };
        match self.ledger.lock() {
            Ok(mut ledger) => ledger.commit(key, receipt.clone(), Instant::now()),
            Err(_) => error!(idempotency_key = %key, "idempotency ledger poisoned; receipt not recorded"),
        }
    }
}

impl Drop for KeyReservation {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            if let Ok(mut ledger) = self.ledger.lock() {
                ledger.release(&key);
            }
        }
    }
}

/// Insert failure, with whether the uploaded object was removed again.
struct InsertFailure {
    error: AppError,
    rolled_back: bool,
}

/// The part of the saga that runs after the object is stored.
struct InsertStage {
    client: PairStoreClient,
    bucket: String,
    object_path: String,
    text: String,
    reservation: KeyReservation,
}

impl InsertStage {
    async fn run(self) -> Result<UploadReceipt, InsertFailure> {
        let inserted = match ImageTextPair::new(self.client.public_url(&self.object_path), self.text)
        {
            Ok(pair) => self.client.insert_pair(&pair).await.map(|()| pair),
            Err(err) => Err(err),
        };

        match inserted {
            Ok(pair) => {
                info!(object_path = %self.object_path, image_url = %pair.image_url, "pair stored");
                let receipt = UploadReceipt {
                    pair,
                    object_path: self.object_path,
                    status: SagaStatus::Committed,
                };
                self.reservation.commit(&receipt);
                Ok(receipt)
            }
            Err(err) => {
                let rolled_back = match self
                    .client
                    .delete_object(&self.bucket, &self.object_path)
                    .await
                {
                    Ok(()) => {
                        warn!(object_path = %self.object_path, "insert failed; uploaded object removed: {}", err);
                        true
                    }
                    Err(rollback_err) => {
                        error!(
                            object_path = %self.object_path,
                            "insert failed and orphaned object could not be removed: {} (rollback: {})",
                            err,
                            rollback_err
                        );
                        false
                    }
                };
                Err(InsertFailure {
                    error: err,
                    rolled_back,
                })
            }
        }
    }
}

/// Runs the upload saga against a [`PairStoreClient`].
pub struct PairUploader {
    client: PairStoreClient,
    checker: DuplicateChecker,
    key_scheme: KeyScheme,
    max_upload_size: usize,
    idempotency: Arc<Mutex<IdempotencyLedger>>,
}

/// Guess an image MIME type from a file extension.
pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(mime)
}

impl PairUploader {
    pub fn new(
        client: PairStoreClient,
        policy: ImageMatchPolicy,
        key_scheme: KeyScheme,
        max_upload_size: usize,
    ) -> Self {
        let checker = DuplicateChecker::new(client.clone(), policy, key_scheme);
        Self {
            client,
            checker,
            key_scheme,
            max_upload_size,
            idempotency: Arc::new(Mutex::new(IdempotencyLedger::new(
                DEFAULT_IDEMPOTENCY_CAPACITY,
                Duration::from_secs(DEFAULT_IDEMPOTENCY_TTL_SECS),
            ))),
        }
    }

    pub fn from_config(client: PairStoreClient, config: &Config) -> Self {
        Self::new(
            client,
            config.duplicate_image_match,
            config.key_scheme,
            config.max_upload_size,
        )
    }

    /// Replace the idempotency bounds; committed keys past `ttl` or beyond
    /// `capacity` are forgotten, oldest first.
    pub fn with_idempotency_limits(mut self, capacity: usize, ttl: Duration) -> Self {
        self.idempotency = Arc::new(Mutex::new(IdempotencyLedger::new(capacity, ttl)));
        self
    }

    pub fn client(&self) -> &PairStoreClient {
        &self.client
    }

    fn ledger(&self) -> Result<MutexGuard<'_, IdempotencyLedger>, AppError> {
        self.idempotency.lock().map_err(|_| AppError::Internal)
    }

    fn validate(&self, request: &UploadRequest) -> Result<String, AppError> {
        if request.bytes.is_empty() || request.file_name.trim().is_empty() {
            return Err(AppError::Validation("An image file is required".to_string()));
        }
        if request.text.trim().is_empty() {
            return Err(AppError::Validation("Text is required".to_string()));
        }
        if request.bytes.len() > self.max_upload_size {
            return Err(AppError::Validation(format!(
                "Image size exceeds maximum of {} bytes",
                self.max_upload_size
            )));
        }
        let declared = request
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        match declared {
            Some(mime) if mime.starts_with("image/") || mime == FALLBACK_CONTENT_TYPE => {
                Ok(mime.to_string())
            }
            Some(mime) => Err(AppError::Validation(format!(
                "Expected an image upload, got '{}'",
                mime
            ))),
            None => Ok(guess_content_type(&request.file_name)
                .unwrap_or(FALLBACK_CONTENT_TYPE)
                .to_string()),
        }
    }

    /// Run one upload through `flow`.
    ///
    /// Replays of a committed idempotency key return early and leave `flow`
    /// untouched.
    ///
    /// # Errors
    /// [`AppError::Validation`], [`AppError::DuplicateImage`] and
    /// [`AppError::DuplicateText`] before any object is stored;
    /// [`AppError::Conflict`] while the same idempotency key is in flight;
    /// storage and timeout errors from the upload or insert stage.
    pub async fn upload(
        &self,
        flow: &mut UploadFlow,
        request: UploadRequest,
    ) -> Result<UploadReceipt, AppError> {
        let idempotency_key = request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        if let Some(key) = idempotency_key.as_deref() {
            let replay = self.ledger()?.reserve(key, Instant::now())?;
            if let Some(receipt) = replay {
                info!(idempotency_key = key, "upload replayed from idempotency key");
                return Ok(receipt);
            }
        }
        let reservation = KeyReservation {
            ledger: self.idempotency.clone(),
            key: idempotency_key,
        };

        self.run_saga(flow, request, reservation).await
    }

    async fn run_saga(
        &self,
        flow: &mut UploadFlow,
        request: UploadRequest,
        reservation: KeyReservation,
    ) -> Result<UploadReceipt, AppError> {
        flow.begin()?;

        let content_type = match self.validate(&request) {
            Ok(content_type) => content_type,
            Err(err) => {
                flow.reject(RejectReason::Invalid)?;
                return Err(err);
            }
        };

        if let Err(err) = self.checker.check(&request.file_name, &request.text).await {
            match &err {
                AppError::DuplicateImage(_) => flow.reject(RejectReason::DuplicateImage)?,
                AppError::DuplicateText(_) => flow.reject(RejectReason::DuplicateText)?,
                other => flow.fail(other)?,
            }
            return Err(err);
        }

        flow.start_upload()?;
        let bucket = self.client.bucket().to_string();
        let key = object_key(self.key_scheme, &request.file_name, Utc::now());
        let object_path = match self
            .client
            .upload_object(&bucket, &key, request.bytes, &content_type)
            .await
        {
            Ok(path) => path,
            Err(err) => {
                flow.fail(&err)?;
                return Err(err);
            }
        };

        flow.start_insert()?;
        let stage = InsertStage {
            client: self.client.clone(),
            bucket,
            object_path,
            text: request.text,
            reservation,
        };
        let outcome = match tokio::spawn(stage.run()).await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                error!("insert task did not complete: {}", join_err);
                Err(InsertFailure {
                    error: AppError::Internal,
                    rolled_back: false,
                })
            }
        };

        match outcome {
            Ok(receipt) => {
                flow.finish(receipt.pair.clone())?;
                Ok(receipt)
            }
            Err(failure) => {
                flow.fail(&failure.error)?;
                if failure.rolled_back {
                    flow.rolled_back();
                }
                Err(failure.error)
            }
        }
    }
}
