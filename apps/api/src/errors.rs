use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::analysis::validation::AnalysisError;
use crate::extract::ExtractError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Uploaded file exceeds {limit} bytes")]
    FileTooLarge { limit: usize },

    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Unparsable analysis: {0}")]
    UnparsableAnalysis(String),

    #[error("Incomplete analysis, missing fields: {}", .0.join(", "))]
    IncompleteAnalysis(Vec<String>),

    #[error("Upstream quota exceeded: {0}")]
    UpstreamQuotaExceeded(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Analysis timed out")]
    AnalysisTimeout,

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error envelope returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

/// Debug rendering of the error that produced a response. Attached as a
/// response extension and only surfaced by [`expose_error_traces`].
#[derive(Debug, Clone)]
pub struct ErrorTrace(pub String);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingInput(_)
            | AppError::InvalidRequest(_)
            | AppError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnreadableDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UpstreamQuotaExceeded(_) | AppError::TooManyRequests => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::AnalysisTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::MalformedUpstreamResponse(_)
            | AppError::UnparsableAnalysis(_)
            | AppError::IncompleteAnalysis(_)
            | AppError::Llm(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, details, solution): (String, Option<String>, Option<&str>) = match self {
            AppError::MissingInput(msg) => (msg.clone(), None, None),
            AppError::InvalidRequest(msg) => ("Invalid request".into(), Some(msg.clone()), None),
            AppError::UnsupportedMediaType(mime) => (
                "Unsupported file type. Only PDF and DOCX are allowed.".into(),
                Some(format!("Received '{mime}'")),
                None,
            ),
            AppError::FileTooLarge { limit } => (
                "Resume file is too large".into(),
                Some(format!("The maximum upload size is {}", format_size(*limit))),
                None,
            ),
            AppError::UnreadableDocument(reason) => (
                "Could not extract text from the resume".into(),
                Some(reason.clone()),
                Some("Make sure the file is not password-protected, corrupted, or a scanned image."),
            ),
            AppError::MalformedUpstreamResponse(_) | AppError::UnparsableAnalysis(_) => (
                "Failed to parse analysis results".into(),
                Some(self.to_string()),
                Some("Please try again."),
            ),
            AppError::IncompleteAnalysis(_) => (
                "Analysis results were incomplete".into(),
                Some(self.to_string()),
                Some("Please try again."),
            ),
            AppError::UpstreamQuotaExceeded(_) => (
                "API quota exceeded".into(),
                None,
                Some("Please try again later or check your OpenRouter plan."),
            ),
            AppError::TooManyRequests => (
                "Too many requests, please try again later.".into(),
                None,
                None,
            ),
            AppError::AnalysisTimeout => (
                "Analysis timed out".into(),
                None,
                Some("The AI service took too long to respond. Please try again."),
            ),
            AppError::Llm(LlmError::MissingApiKey) => (
                "AI service is not configured".into(),
                None,
                Some("Set OPENROUTER_API_KEY on the server."),
            ),
            AppError::Llm(_) => ("Failed to get analysis from AI service".into(), None, None),
            AppError::Internal(_) => ("Internal server error".into(), None, None),
        };

        ErrorBody {
            error,
            details,
            solution: solution.map(str::to_string),
        }
    }
}

/// Human-readable byte count: `5 MB`, `5.5 MB`, `512 KB`, `300 bytes`.
fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    let value = bytes as f64;
    let (scaled, unit) = if value >= MIB {
        (value / MIB, "MB")
    } else if value >= KIB {
        (value / KIB, "KB")
    } else {
        return format!("{bytes} bytes");
    };

    let rendered = format!("{scaled:.1}");
    let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{rendered} {unit}")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            AppError::Llm(e) => tracing::error!("LLM error: {e}"),
            _ if status.is_server_error() => tracing::error!("{self}"),
            _ => tracing::debug!(%status, "request failed: {self}"),
        }

        let mut response = (status, Json(self.body())).into_response();
        response
            .extensions_mut()
            .insert(ErrorTrace(format!("{self:?}")));
        response
    }
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedMediaType(mime) => AppError::UnsupportedMediaType(mime),
            ExtractError::Unreadable(reason) => AppError::UnreadableDocument(reason),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::MalformedUpstreamResponse(msg) => {
                AppError::MalformedUpstreamResponse(msg)
            }
            AnalysisError::UnparsableAnalysis(msg) => AppError::UnparsableAnalysis(msg),
            AnalysisError::IncompleteAnalysis { missing } => AppError::IncompleteAnalysis(missing),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        if e.is_quota_exceeded() {
            return AppError::UpstreamQuotaExceeded(e.to_string());
        }
        match e {
            LlmError::Timeout => AppError::AnalysisTimeout,
            other => AppError::Llm(other),
        }
    }
}

/// Development-only middleware: copies the [`ErrorTrace`] of a failed response
/// into its JSON body under `stack`.
pub async fn expose_error_traces(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(ErrorTrace(trace)) = response.extensions().get::<ErrorTrace>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("could not buffer error body: {e}");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut envelope = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        _ => return Response::from_parts(parts, Body::from(bytes)),
    };
    envelope.insert("stack".to_string(), Value::String(trace));

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(Value::Object(envelope).to_string()))
}
