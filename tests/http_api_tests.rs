//! # HTTP front-end routes
//!
//! Drives the router with `tower::ServiceExt::oneshot` over an in-memory
//! storage network.

use axum::Router;
use bytes::Bytes;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use content_vault::models::file_metadata::{FileMetadata, SearchResult};
use content_vault::routes::routes::routes;
use content_vault::services::connection::ConnectionParams;
use content_vault::services::content_client::{ContentClient, ContextPolicy, ExecutionContext};
use content_vault::services::memory::{MemoryConnector, MemoryNetwork};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "content-vault-test-boundary";

fn client() -> (ContentClient, Arc<MemoryNetwork>) {
    let network = Arc::new(MemoryNetwork::with_chunk_size(4));
    let connector = Arc::new(MemoryConnector::new(network.clone()));
    let params = ConnectionParams::new("memory", 5001, "https", "", "");
    (ContentClient::new(connector, params), network)
}

fn app(client: ContentClient) -> Router {
    routes(1024 * 1024).with_state(client)
}

fn upload_request(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/files")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_then_download() {
    let (client, network) = client();
    let app = app(client);

    let resp = app
        .clone()
        .oneshot(upload_request("file", "hello.txt", "text/plain", b"hello, vault"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let meta: FileMetadata = body_json(resp).await;
    assert_eq!(meta.name, "hello.txt");
    assert_eq!(meta.mime_type, "text/plain");
    assert_eq!(meta.size, 12);
    assert_eq!(network.object_count(), 2);

    let resp = app.oneshot(get(&format!("/files/{}", meta.cid))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"hello, vault");
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let (client, network) = client();
    let resp = app(client)
        .oneshot(upload_request("attachment", "x.txt", "text/plain", b"x"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"], "no file selected");
    assert_eq!(network.add_calls(), 0);
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let (client, network) = client();
    let app = routes(64).with_state(client);
    let resp = app
        .oneshot(upload_request("file", "big.bin", "application/octet-stream", &[7u8; 4096]))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    assert_eq!(network.add_calls(), 0);
}

#[tokio::test]
async fn unknown_cid_is_not_found() {
    let (client, _) = client();
    let resp = app(client).oneshot(get("/files/mmissing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn download_accepts_a_path_below_a_cid() {
    let (client, network) = client();
    network.insert_chunks(
        "mdirectory/docs/readme.txt",
        vec![Bytes::from_static(b"read "), Bytes::from_static(b"me")],
    );

    let resp = app(client)
        .oneshot(get("/files/mdirectory/docs/readme.txt"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes, Bytes::from_static(b"read me"));
}

#[tokio::test]
async fn search_returns_empty_list() {
    let (client, _) = client();
    let app = app(client);

    for uri in ["/search?q=hello.txt", "/search?q=", "/search"] {
        let resp = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let results: Vec<SearchResult> = body_json(resp).await;
        assert!(results.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn guarded_server_context_is_forbidden() {
    let (client, network) = client();
    let client = client.with_context(ExecutionContext::Server, ContextPolicy::RequireClient);
    let app = app(client);

    let resp = app
        .clone()
        .oneshot(upload_request("file", "a.txt", "text/plain", b"a"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app.clone().oneshot(get("/search?q=a")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"], "Failed to search files. Please try again.");

    let resp = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(network.calls(), 0);
}

#[tokio::test]
async fn probes_report_status() {
    let (client, _) = client();
    let app = app(client);

    let resp = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected"], false);
    assert_eq!(body["checks"]["context"]["ok"], true);

    app.clone()
        .oneshot(upload_request("file", "a.txt", "text/plain", b"a"))
        .await
        .unwrap();
    let resp = app.oneshot(get("/readyz")).await.unwrap();
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["connected"], true);
}
