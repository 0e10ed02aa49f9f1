//! The storage network boundary.
//!
//! The client only ever needs two primitives from a content-addressed
//! network: push bytes and get an identifier back, and stream the bytes for
//! an identifier. Connection construction sits behind [`NetworkConnector`]
//! so the client can build exactly one connection lazily and tests can
//! observe when that happens.

use crate::services::connection::ConnectionParams;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

/// Ordered chunks of a stored object, in delivery order.
pub type ChunkStream = BoxStream<'static, NetworkResult<Bytes>>;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("gateway {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
    #[error("content `{0}` not found")]
    NotFound(String),
    #[error("storage network unavailable: {0}")]
    Unavailable(String),
    #[error("invalid connection parameters: {0}")]
    InvalidParams(String),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl NetworkError {
    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Transport failures are transient: timeouts, refused connections, a
    /// connection dropped before the reply and a body cut short mid-transfer.
    /// So are 5xx, 429 and an unavailable network. Unknown content, other
    /// 4xx, malformed replies and bad connection parameters are not.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Http { source, .. } => {
                source.is_timeout()
                    || source.is_connect()
                    || source.is_request()
                    || source.is_body()
                    || source.is_decode()
            }
            NetworkError::Status { status, .. } => *status >= 500 || *status == 429,
            NetworkError::Unavailable(_) => true,
            NetworkError::Decode { .. }
            | NetworkError::NotFound(_)
            | NetworkError::InvalidParams(_) => false,
        }
    }

    /// Whether the network reported the identifier as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NetworkError::NotFound(_))
    }
}

/// A live connection to a content-addressed storage network.
#[async_trait]
pub trait StorageNetwork: Send + Sync {
    /// Store `bytes` and return the content identifier the network assigned.
    async fn add(&self, bytes: Bytes) -> NetworkResult<String>;

    /// Stream the stored bytes for `cid`.
    async fn cat(&self, cid: &str) -> NetworkResult<ChunkStream>;
}

/// Builds a [`StorageNetwork`] connection from [`ConnectionParams`].
#[async_trait]
pub trait NetworkConnector: Send + Sync {
    async fn connect(&self, params: &ConnectionParams) -> NetworkResult<Arc<dyn StorageNetwork>>;
}
