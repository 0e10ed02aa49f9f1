//! HTTP handlers for the caller-facing file operations.
//! Storage concerns are delegated to `ContentClient`.

use crate::{
    errors::AppError,
    models::{
        file_metadata::{FileMetadata, SearchResult},
        payload::FilePayload,
    },
    services::content_client::ContentClient,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

const SEARCH_FAILED: &str = "Failed to search files. Please try again.";

/// Query params accepted by `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// `POST /files`: upload the multipart field `file`, answer with its metadata.
pub async fn upload_file(
    State(client): State<ContentClient>,
    mut multipart: Multipart,
) -> Result<Json<FileMetadata>, AppError> {
    let payload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::bad_request("no file selected"))?;

    let metadata = client.upload(&payload).await?;
    Ok(Json(metadata))
}

/// `GET /files/{*cid}`: the stored bytes, reassembled. The capture may be a
/// bare identifier or an IPFS path below one (`<cid>/<name>`).
pub async fn retrieve_file(
    State(client): State<ContentClient>,
    Path(cid): Path<String>,
) -> Result<Response, AppError> {
    let bytes = client.retrieve(&cid).await?;
    let len = bytes.len();

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Ok(response)
}

/// `GET /search?q=`: listing of matching uploads.
pub async fn search_files(
    State(client): State<ContentClient>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let query = query.q.unwrap_or_default();
    let results = client.search(&query).await.map_err(|err| {
        let app = AppError::from(err);
        AppError::new(app.status, SEARCH_FAILED).retryable(app.retryable)
    })?;

    Ok(Json(results.iter().map(SearchResult::from).collect()))
}

/// Pull the first `file` field out of the body. Other fields are skipped.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<FilePayload>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::new(err.status(), format!("invalid multipart body: {}", err)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::new(err.status(), format!("could not read file field: {}", err)))?;

        tracing::debug!(name = %name, mime_type = %mime_type, len = bytes.len(), "received upload");
        return Ok(Some(FilePayload::new(name, mime_type, bytes)));
    }
    Ok(None)
}
