//! Core domain library for pairstore (config, models, storage backends, upload flow).

/// Pair Store Client over injected storage backends.
pub mod client;
/// Configuration loading and defaults.
pub mod config;
/// Shared defaults used across pairstore crates.
pub mod constants;
/// Pre-insert duplicate checks.
pub mod duplicate;
/// Process-global environment mutation helpers.
pub mod env;
/// Application error types (storage/domain).
pub mod error;
/// Lookup and upload state machines.
pub mod flow;
/// Canonical text and image-name match predicates.
pub mod matcher;
/// Data models for API requests and persistence.
pub mod models;
/// Object key naming helpers.
pub mod naming;
/// Storage backend seams and implementations.
pub mod store;
/// Upload saga (validate, check, upload, insert, compensate).
pub mod upload;
/// Public URL building and normalization.
pub mod url;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::PairStoreClient;
pub use config::Config;
pub use constants::*;
pub use error::AppError;
pub use models::pair::{ImageTextPair, MatchMode};
pub use upload::PairUploader;
