//! HTTP request handlers.

/// Health and backend status.
pub mod health;
/// Image-from-text and text-from-image lookups.
pub mod lookup;
pub(crate) mod multipart;
pub(crate) mod normalize;
/// Upload, listing and check-image endpoints.
pub mod pair;
