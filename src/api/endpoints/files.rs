//! Stored-file retrieval endpoint.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `GET /files/:filename` — serve a stored upload back.
///
/// Only bare stored names resolve; anything path-like is rejected before
/// it reaches the filesystem.
pub async fn fetch(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = ctx
        .files
        .resolve(&filename)
        .ok_or_else(|| ApiError::NotFound(format!("no stored file named {filename}")))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("could not read stored file: {e}")))?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Ok((
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        bytes,
    )
        .into_response())
}
