//! Upload-and-analyze endpoint: one PDF in, one de-identified analysis out.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::ingest;
use crate::models::Biomarker;

#[derive(Serialize)]
pub struct AnalyzeResponse {
    /// Pseudonymous patient token. The only patient reference a client
    /// ever sees.
    pub patient: String,
    pub lab_date: NaiveDate,
    pub analysis: AnalysisBody,
    /// "success", or "fallback" when the analysis collaborator was
    /// unavailable and the fixed fallback biomarkers were substituted.
    pub status: &'static str,
    pub persisted: bool,
    pub original_filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_url: String,
}

#[derive(Serialize)]
pub struct AnalysisBody {
    pub biomarkers: Vec<Biomarker>,
}

/// `POST /analyze_bloodwork` — multipart upload of one PDF report.
///
/// The pipeline is synchronous (blocking HTTP clients, regex passes over
/// full document text), so it runs on the blocking pool.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (original_filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("no file field in upload".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }

    let uploaded_at = Utc::now();
    let stored = ctx.files.save(&original_filename, &bytes)?;

    let processor = Arc::clone(&ctx.processor);
    let file_url = stored.file_url.clone();
    let filename = original_filename.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let doc = ingest::ingest_pdf(&bytes, &filename, uploaded_at)?;
        processor.process(&doc, &file_url).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("pipeline task failed: {e}")))??;

    Ok(Json(AnalyzeResponse {
        patient: outcome.patient_token,
        lab_date: outcome.lab_date,
        analysis: AnalysisBody {
            biomarkers: outcome.biomarkers,
        },
        status: if outcome.used_fallback {
            "fallback"
        } else {
            "success"
        },
        persisted: !outcome.unpersisted,
        original_filename,
        uploaded_at,
        file_url: stored.file_url,
    }))
}
