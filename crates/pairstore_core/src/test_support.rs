//! Shared test-only helpers for pairstore_core.

use crate::store::MemoryBackend;
use crate::{PairStoreClient, DEFAULT_BUCKET};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const TEST_PUBLIC_BASE: &str = "https://project.example.co";

/// Client over a fresh in-memory backend, plus the backend for inspection.
pub(crate) fn memory_client() -> (PairStoreClient, Arc<MemoryBackend>) {
    memory_client_with_timeout(Duration::from_secs(5))
}

pub(crate) fn memory_client_with_timeout(
    timeout: Duration,
) -> (PairStoreClient, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let client =
        PairStoreClient::with_backend(backend.clone(), DEFAULT_BUCKET, TEST_PUBLIC_BASE, timeout);
    (client, backend)
}

/// A tiny PNG signature; content is never decoded.
pub(crate) fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
}
