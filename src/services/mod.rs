//! Storage client and the storage network it talks to.

pub mod connection;
pub mod content_client;
pub mod ipfs_http;
pub mod memory;
pub mod network;
pub mod sidecar;
