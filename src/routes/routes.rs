//! Defines routes for the file front-end.
//!
//! ## Structure
//! - `POST /files`        upload a file (multipart field `file`)
//! - `GET  /files/{*cid}` retrieve a file by content identifier or `<cid>/<path>`
//! - `GET  /search?q=`    search uploaded files
//! - `GET  /healthz`, `GET /readyz`: probes

use crate::{
    handlers::{
        file_handlers::{retrieve_file, search_files, upload_file},
        health_handlers::{healthz, readyz},
    },
    services::content_client::ContentClient,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for all front-end routes.
///
/// The router carries shared state (`ContentClient`) to all handlers.
/// `max_upload_bytes` caps request bodies on the upload route.
pub fn routes(max_upload_bytes: usize) -> Router<ContentClient> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/files",
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/files/{*cid}", get(retrieve_file))
        .route("/search", get(search_files))
}
