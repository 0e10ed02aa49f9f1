//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness from the client's execution-context capability

use crate::services::content_client::ContentClient;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness probe. Always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Ready when the client is allowed to run in this execution context. Also
/// reports whether the storage network connection has been built yet; that
/// never happens here, since building it is left to the first real operation.
///
/// HTTP 200 when ready, HTTP 503 otherwise.
pub async fn readyz(State(client): State<ContentClient>) -> impl IntoResponse {
    let context_check = if client.is_permitted() {
        CheckStatus {
            ok: true,
            error: None,
        }
    } else {
        CheckStatus {
            ok: false,
            error: Some(format!(
                "policy {} forbids running as {}",
                client.policy(),
                client.context()
            )),
        }
    };
    let overall_ok = context_check.ok;

    let mut checks = HashMap::new();
    checks.insert("context", context_check);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        connected: client.is_connected(),
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    connected: bool,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
