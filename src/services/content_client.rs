//! src/services/content_client.rs
//!
//! ContentClient: upload, retrieve and search on top of a content-addressed
//! storage network. It owns the connection parameters and builds exactly one
//! network connection, lazily, on first use. Whether operations are allowed
//! at all is decided once, when the client is built, from the execution
//! context it runs in and the configured policy.

use crate::{
    models::{file_metadata::FileMetadata, payload::FilePayload},
    services::{
        connection::ConnectionParams,
        network::{NetworkConnector, NetworkError, NetworkResult, StorageNetwork},
        sidecar::{build_metadata, write_sidecar},
    },
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Where the process using the client runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A user-side process that may hold the project credentials.
    Client,
    /// A shared server process.
    Server,
}

/// Which execution contexts may use the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextPolicy {
    RequireClient,
    Unrestricted,
}

impl ContextPolicy {
    pub fn permits(self, context: ExecutionContext) -> bool {
        match self {
            ContextPolicy::Unrestricted => true,
            ContextPolicy::RequireClient => context == ExecutionContext::Client,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Retrieve,
    Search,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upload => write!(f, "file upload"),
            Operation::Retrieve => write!(f, "file retrieval"),
            Operation::Search => write!(f, "file search"),
        }
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Client => write!(f, "client"),
            ExecutionContext::Server => write!(f, "server"),
        }
    }
}

impl fmt::Display for ContextPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextPolicy::RequireClient => write!(f, "require-client"),
            ContextPolicy::Unrestricted => write!(f, "unrestricted"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseSettingError {
    kind: &'static str,
    value: String,
}

impl FromStr for ExecutionContext {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(ExecutionContext::Client),
            "server" => Ok(ExecutionContext::Server),
            _ => Err(ParseSettingError {
                kind: "execution context",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for ContextPolicy {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "require-client" => Ok(ContextPolicy::RequireClient),
            "unrestricted" => Ok(ContextPolicy::Unrestricted),
            _ => Err(ParseSettingError {
                kind: "context policy",
                value: s.to_string(),
            }),
        }
    }
}

/// An operation was attempted from an execution context the policy forbids.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{operation} can only be performed in a client execution context (running as {context})")]
pub struct ContextError {
    pub operation: Operation,
    pub context: ExecutionContext,
}

/// How far an upload got before it failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadStage {
    /// The connection could not be constructed.
    Connect,
    /// Pushing the payload failed. Nothing was stored.
    Primary,
    /// The payload is stored under `primary_cid` but its metadata record is not.
    Sidecar { primary_cid: String },
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStage::Connect => write!(f, "connecting"),
            UploadStage::Primary => write!(f, "storing payload"),
            UploadStage::Sidecar { primary_cid } => {
                write!(f, "storing metadata for `{}`", primary_cid)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("upload failed while {stage}: {source}")]
    Upload {
        stage: UploadStage,
        source: NetworkError,
    },
    #[error("retrieval of `{cid}` failed: {source}")]
    Retrieval { cid: String, source: NetworkError },
}

impl ClientError {
    /// Whether retrying the same call could succeed. Context errors never do.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Context(_) => false,
            ClientError::Upload { source, .. } | ClientError::Retrieval { source, .. } => {
                source.is_transient()
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// ContentClient provides the three caller-facing operations:
/// - Upload a file (stores the payload, then a metadata sidecar)
/// - Retrieve a file by content identifier (reassembles streamed chunks)
/// - Search (accepted but unimplemented; always empty)
///
/// Cloning is cheap and clones share the single lazily-built connection.
#[derive(Clone)]
pub struct ContentClient {
    connector: Arc<dyn NetworkConnector>,
    params: Arc<ConnectionParams>,
    connection: Arc<OnceCell<Arc<dyn StorageNetwork>>>,
    context: ExecutionContext,
    policy: ContextPolicy,
    permitted: bool,
}

impl ContentClient {
    /// Create a client for a client-side context under the guarded policy.
    /// No connection is made until the first operation.
    pub fn new(connector: Arc<dyn NetworkConnector>, params: ConnectionParams) -> Self {
        Self {
            connector,
            params: Arc::new(params),
            connection: Arc::new(OnceCell::new()),
            context: ExecutionContext::Client,
            policy: ContextPolicy::RequireClient,
            permitted: true,
        }
    }

    /// Declare the execution context and policy; the capability is fixed here.
    pub fn with_context(mut self, context: ExecutionContext, policy: ContextPolicy) -> Self {
        self.context = context;
        self.policy = policy;
        self.permitted = policy.permits(context);
        if !self.permitted {
            warn!(
                context = %context,
                policy = %policy,
                "content client built in an unsupported execution context; all operations will be refused"
            );
        }
        self
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn policy(&self) -> ContextPolicy {
        self.policy
    }

    /// Whether operations may run here.
    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    /// Whether the storage network connection has been built yet.
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    fn guard(&self, operation: Operation) -> Result<(), ContextError> {
        if self.permitted {
            return Ok(());
        }
        let err = ContextError {
            operation,
            context: self.context,
        };
        warn!("{}", err);
        Err(err)
    }

    /// The shared connection, built on first call. Concurrent first callers
    /// wait on the same initialization; a failed attempt leaves the slot
    /// empty for the next caller.
    async fn connection(&self) -> NetworkResult<Arc<dyn StorageNetwork>> {
        let network = self
            .connection
            .get_or_try_init(|| async {
                info!(
                    host = %self.params.host,
                    port = self.params.port,
                    protocol = %self.params.protocol,
                    "constructing storage network connection"
                );
                self.connector.connect(&self.params).await
            })
            .await?;
        Ok(network.clone())
    }

    /// Store `payload` and a metadata record describing it.
    ///
    /// Returns the record, whose `cid` is the payload's identifier. The two
    /// pushes are not atomic: if the record push fails the payload stays
    /// stored and the error carries [`UploadStage::Sidecar`] with its cid.
    pub async fn upload(&self, payload: &FilePayload) -> ClientResult<FileMetadata> {
        self.guard(Operation::Upload)?;

        let result = self.store(payload).await;
        match &result {
            Ok(meta) => info!(name = %meta.name, cid = %meta.cid, size = meta.size, "file uploaded"),
            Err(err) => error!(name = %payload.name, "error uploading file to storage network: {}", err),
        }
        result
    }

    async fn store(&self, payload: &FilePayload) -> ClientResult<FileMetadata> {
        let network = self.connection().await.map_err(|source| ClientError::Upload {
            stage: UploadStage::Connect,
            source,
        })?;

        let cid = network
            .add(payload.bytes.clone())
            .await
            .map_err(|source| ClientError::Upload {
                stage: UploadStage::Primary,
                source,
            })?;
        debug!(cid = %cid, len = payload.bytes.len(), "payload stored");

        let metadata = build_metadata(payload, &cid, Utc::now());
        write_sidecar(network.as_ref(), &metadata)
            .await
            .map_err(|source| ClientError::Upload {
                stage: UploadStage::Sidecar { primary_cid: cid },
                source,
            })?;

        Ok(metadata)
    }

    /// Fetch the bytes stored under `cid`, concatenating chunks in the order
    /// the network delivers them.
    pub async fn retrieve(&self, cid: &str) -> ClientResult<Bytes> {
        self.guard(Operation::Retrieve)?;

        let result = self
            .fetch(cid)
            .await
            .map_err(|source| ClientError::Retrieval {
                cid: cid.to_string(),
                source,
            });
        match &result {
            Ok(bytes) => debug!(cid = %cid, len = bytes.len(), "file retrieved"),
            Err(err) => error!("error retrieving file from storage network: {}", err),
        }
        result
    }

    async fn fetch(&self, cid: &str) -> NetworkResult<Bytes> {
        let network = self.connection().await?;
        let mut stream = network.cat(cid).await?;

        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Search uploaded files.
    ///
    /// Nothing records which metadata objects exist, so there is nothing to
    /// search: the result is always empty and the network is not contacted.
    pub async fn search(&self, query: &str) -> ClientResult<Vec<FileMetadata>> {
        self.guard(Operation::Search)?;
        info!(query = %query, "searching files");
        Ok(Vec::new())
    }
}
