//! Analysis pipeline.
//!
//! Flow: Received → Extracting → Normalizing → Prompting → Calling (≤ N attempts)
//!       → Validating → Succeeded | Failed.
//!
//! Only the Calling step retries; a failure anywhere else ends the request.

use serde_json::Value;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::normalize::normalize;
use crate::analysis::prompts::build_prompt;
use crate::analysis::validation::{validate, AnalysisResult};
use crate::analysis::AnalysisKind;
use crate::errors::AppError;
use crate::extract::{extract_document, UploadedDocument};
use crate::llm_client::LlmClient;

/// Full analysis of an uploaded résumé. The reply is augmented with the
/// extracted résumé text and the normalized job description so follow-up
/// requests can reuse them without re-uploading the file.
pub async fn analyze_upload(
    llm: &LlmClient,
    document: UploadedDocument,
    raw_job_description: &str,
) -> Result<AnalysisResult, AppError> {
    let kind = AnalysisKind::FullAnalysis;
    let span = info_span!("analysis", id = %Uuid::new_v4(), kind = kind.label());

    async move {
        debug!(
            mime_type = %document.mime_type,
            bytes = document.content.len(),
            "extracting"
        );
        let resume_text = extract_document(document).await?;

        debug!("normalizing");
        let job_text = normalized_job_description(raw_job_description)?;

        let mut result = run(llm, kind, &resume_text, &job_text).await?;
        result.insert("success".to_string(), Value::Bool(true));
        result.insert("resumeText".to_string(), Value::String(resume_text));
        result.insert("jobDescriptionText".to_string(), Value::String(job_text));
        Ok(result)
    }
    .instrument(span)
    .await
}

/// Improvement or job-alignment analysis for text from an earlier full analysis.
pub async fn analyze_text(
    llm: &LlmClient,
    kind: AnalysisKind,
    resume_text: &str,
    raw_job_description: &str,
) -> Result<AnalysisResult, AppError> {
    let span = info_span!("analysis", id = %Uuid::new_v4(), kind = kind.label());

    async move {
        debug!("normalizing");
        let job_text = normalized_job_description(raw_job_description)?;
        run(llm, kind, resume_text.trim(), &job_text).await
    }
    .instrument(span)
    .await
}

fn normalized_job_description(raw: &str) -> Result<String, AppError> {
    let job_text = normalize(raw);
    if job_text.is_empty() {
        return Err(AppError::MissingInput(
            "Job description is required".to_string(),
        ));
    }
    Ok(job_text)
}

/// Prompting → Calling → Validating.
async fn run(
    llm: &LlmClient,
    kind: AnalysisKind,
    resume_text: &str,
    job_text: &str,
) -> Result<AnalysisResult, AppError> {
    let prompt = build_prompt(kind, resume_text, job_text);
    debug!(prompt_chars = prompt.len(), "prompting");

    let body = llm.complete(&prompt, llm.options(kind.max_tokens())).await?;

    debug!("validating");
    let result = validate(kind, &body)?;

    info!(fields = result.len(), "analysis succeeded");
    Ok(result)
}
