//! IPFS HTTP API implementation of the storage network.
//!
//! - `POST /api/v0/add` (multipart, field `file`) returns `{"Name","Hash","Size"}`
//! - `POST /api/v0/cat?arg=<cid>` streams the object body
//!
//! The Basic authorization header is installed once as a default header when
//! the connection is built, so it rides along on every call.

use crate::services::{
    connection::ConnectionParams,
    network::{ChunkStream, NetworkConnector, NetworkError, NetworkResult, StorageNetwork},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
    multipart::{Form, Part},
};
use serde::Deserialize;
use std::sync::Arc;

const ADD_PATH: &str = "/api/v0/add";
const CAT_PATH: &str = "/api/v0/cat";

/// Builds [`IpfsHttpNetwork`] connections.
#[derive(Clone, Debug, Default)]
pub struct IpfsHttpConnector;

#[async_trait]
impl NetworkConnector for IpfsHttpConnector {
    async fn connect(&self, params: &ConnectionParams) -> NetworkResult<Arc<dyn StorageNetwork>> {
        let network = IpfsHttpNetwork::new(params)?;
        tracing::info!(
            host = %params.host,
            port = params.port,
            protocol = %params.protocol,
            "connected to IPFS HTTP gateway"
        );
        Ok(Arc::new(network))
    }
}

/// A connection to an IPFS node or pinning gateway over its HTTP RPC API.
#[derive(Clone, Debug)]
pub struct IpfsHttpNetwork {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: Option<String>,
    #[serde(rename = "Path")]
    path: Option<String>,
}

impl IpfsHttpNetwork {
    pub fn new(params: &ConnectionParams) -> NetworkResult<Self> {
        let mut auth = HeaderValue::from_str(&params.authorization())
            .map_err(|err| NetworkError::InvalidParams(format!("authorization header: {}", err)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let base_url = params.base_url();
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| NetworkError::Http {
                endpoint: base_url.clone(),
                source,
            })?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl StorageNetwork for IpfsHttpNetwork {
    async fn add(&self, bytes: Bytes) -> NetworkResult<String> {
        let len = bytes.len() as u64;
        let form = Form::new().part("file", Part::stream_with_length(bytes, len).file_name("file"));

        let resp = self
            .client
            .post(self.url(ADD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|source| NetworkError::Http {
                endpoint: ADD_PATH.into(),
                source,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| NetworkError::Http {
            endpoint: ADD_PATH.into(),
            source,
        })?;
        if !status.is_success() {
            return Err(NetworkError::Status {
                endpoint: ADD_PATH.into(),
                status: status.as_u16(),
                body,
            });
        }

        parse_add_response(&body)
    }

    async fn cat(&self, cid: &str) -> NetworkResult<ChunkStream> {
        let resp = self
            .client
            .post(self.url(CAT_PATH))
            .query(&[("arg", cid)])
            .send()
            .await
            .map_err(|source| NetworkError::Http {
                endpoint: CAT_PATH.into(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!(
                        cid = %cid,
                        status = status.as_u16(),
                        error = %err,
                        "could not read error body from cat"
                    );
                    String::new()
                }
            };
            if is_unknown_content(status, &body) {
                return Err(NetworkError::NotFound(cid.to_string()));
            }
            return Err(NetworkError::Status {
                endpoint: CAT_PATH.into(),
                status: status.as_u16(),
                body,
            });
        }

        let stream = resp.bytes_stream().map(|chunk| {
            chunk.map_err(|source| NetworkError::Http {
                endpoint: CAT_PATH.into(),
                source,
            })
        });
        Ok(stream.boxed())
    }
}

/// Extract the identifier from an `add` reply.
///
/// The node may emit one JSON object per line; the last one describes the
/// root. `Hash` is preferred, `Path` is accepted from gateways that only
/// report that.
fn parse_add_response(body: &str) -> NetworkResult<String> {
    let line = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .ok_or_else(|| NetworkError::Decode {
            endpoint: ADD_PATH.into(),
            reason: "empty response body".into(),
        })?;

    let parsed: AddResponse = serde_json::from_str(line).map_err(|err| NetworkError::Decode {
        endpoint: ADD_PATH.into(),
        reason: err.to_string(),
    })?;

    parsed
        .hash
        .or(parsed.path)
        .filter(|cid| !cid.is_empty())
        .ok_or_else(|| NetworkError::Decode {
            endpoint: ADD_PATH.into(),
            reason: "missing CID in response".into(),
        })
}

/// The RPC API answers unknown or malformed identifiers with 404 or with a
/// 500 whose message names the path.
fn is_unknown_content(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    let lower = body.to_ascii_lowercase();
    status == StatusCode::INTERNAL_SERVER_ERROR
        && (lower.contains("invalid path") || lower.contains("invalid cid") || lower.contains("not found"))
}
