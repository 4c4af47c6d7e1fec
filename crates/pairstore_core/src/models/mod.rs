//! Data models shared by the store, server and CLI.

/// Image/text pair entity and API payloads.
pub mod pair;
