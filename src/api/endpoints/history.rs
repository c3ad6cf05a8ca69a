//! Patient history endpoint.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::HistoryEntry;
use crate::pipeline::token::TOKEN_PREFIX;

#[derive(Serialize)]
pub struct HistoryResponse {
    pub patient: String,
    /// Entries in append order, oldest first.
    pub history: Vec<HistoryEntry>,
    pub count: usize,
}

/// `GET /history/:patient_token` — all stored entries for one token.
///
/// Unknown tokens get an empty list, not a 404: the caller cannot tell
/// an unseen patient from one whose reports never parsed.
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(patient_token): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    if !patient_token.starts_with(TOKEN_PREFIX) {
        return Err(ApiError::BadRequest(format!(
            "patient token must start with {TOKEN_PREFIX}"
        )));
    }

    // An unreachable store degrades to an empty history rather than a
    // failed request, matching the pipeline's read policy.
    let history = match ctx.history.read_all(&patient_token) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(%patient_token, error = %e, "history read failed, returning empty");
            Vec::new()
        }
    };

    Ok(Json(HistoryResponse {
        count: history.len(),
        patient: patient_token,
        history,
    }))
}
