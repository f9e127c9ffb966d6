//! Signed file delivery for locally stored artifacts.

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

use super::handlers::{error_response, ApiError};
use crate::state::AppState;

/// Signature parameters appended by the local storage backend.
#[derive(Debug, Deserialize)]
pub struct SignatureParams {
    pub expires: i64,
    pub signature: String,
}

/// Serve an artifact when the URL signature is valid and unexpired.
///
/// Delegates to [`ServeFile`] for streaming, range requests and
/// conditional GETs.
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Query<SignatureParams>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let Some(storage) = state.local_files() else {
        return Err(error_response(StatusCode::NOT_FOUND, "File not found"));
    };

    if !storage.verify_signature(&key, params.expires, &params.signature) {
        debug!(key = %key, "Rejected file request with invalid or expired signature");
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Invalid or expired signature",
        ));
    }

    let path = storage
        .path_for(&key)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "File not found"))?;

    match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(e) => {
            warn!(path = ?path, error = %e, "Failed to serve artifact");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read file",
            ))
        }
    }
}
