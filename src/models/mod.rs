//! Core data types shared by the storage client and the HTTP front-end.
//!
//! These serialize as JSON via `serde` using the same field names the
//! metadata sidecar uses on the storage network.

pub mod file_metadata;
pub mod payload;
