//! Axum route handlers for the analysis endpoints.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::analysis::pipeline::{analyze_text, analyze_upload};
use crate::analysis::validation::AnalysisResult;
use crate::analysis::AnalysisKind;
use crate::errors::AppError;
use crate::extract::UploadedDocument;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";
const JOB_DESCRIPTION_FIELD: &str = "jobDescription";

/// Body of the follow-up endpoints, using the text returned by `/analyze`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRequest {
    pub resume_text: Option<String>,
    pub job_description: Option<String>,
}

/// POST /analyze
/// Multipart form: `resume` (PDF or DOCX file), `jobDescription` (text).
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let limit = state.config.max_upload_bytes;

    let mut resume: Option<UploadedDocument> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            RESUME_FIELD => {
                let file_name = field.file_name().map(str::to_string);
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let content = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

                if content.len() > limit {
                    return Err(AppError::FileTooLarge { limit });
                }
                // Browsers send an empty part when no file was chosen.
                if !content.is_empty() {
                    resume = Some(UploadedDocument {
                        content,
                        mime_type,
                        file_name,
                    });
                }
            }
            JOB_DESCRIPTION_FIELD => {
                job_description = Some(field.text().await.map_err(|e| multipart_error(e, limit))?);
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let resume =
        resume.ok_or_else(|| AppError::MissingInput("No resume file uploaded".to_string()))?;
    let job_description = job_description
        .filter(|j| !j.trim().is_empty())
        .ok_or_else(|| AppError::MissingInput("Job description is required".to_string()))?;

    let result = analyze_upload(&state.llm, resume, &job_description).await?;
    Ok(Json(result))
}

/// POST /analyze-improvements
pub async fn handle_improvements(
    State(state): State<AppState>,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    follow_up(&state, AnalysisKind::Improvements, payload).await
}

/// POST /analyze-job-alignment
pub async fn handle_job_alignment(
    State(state): State<AppState>,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    follow_up(&state, AnalysisKind::JobAlignment, payload).await
}

async fn follow_up(
    state: &AppState,
    kind: AnalysisKind,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let resume_text = request
        .resume_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::MissingInput("Resume text is required".to_string()))?;
    let job_description = request
        .job_description
        .filter(|j| !j.trim().is_empty())
        .ok_or_else(|| AppError::MissingInput("Job description is required".to_string()))?;

    let result = analyze_text(&state.llm, kind, &resume_text, &job_description).await?;
    Ok(Json(result))
}

fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge { limit }
    } else {
        AppError::InvalidRequest(e.body_text())
    }
}
