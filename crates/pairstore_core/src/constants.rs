//! Shared constants used across pairstore crates.

/// Default API port for the pairstore server.
pub const DEFAULT_PORT: u16 = 38412;

/// Default maximum image upload size accepted by the API layer.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Default timeout applied to every hosted-service call, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Bucket holding uploaded image objects.
pub const DEFAULT_BUCKET: &str = "images";

/// Table holding `(image_url, text_content)` rows.
pub const DEFAULT_TABLE: &str = "image_text_pairs";

/// Committed idempotency keys remembered per process.
pub const DEFAULT_IDEMPOTENCY_CAPACITY: usize = 1024;

/// How long a committed idempotency key keeps replaying its receipt, in seconds.
pub const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 24 * 60 * 60;

/// Default base URL for CLI/API clients.
pub const DEFAULT_CLI_SERVER_URL: &str = "http://localhost:38412";

/// Message surfaced when a listing has no rows.
pub const EMPTY_LISTING_MESSAGE: &str = "No images found";
