//! LLM client: the single point of entry for all chat-completion calls.
//!
//! No other module talks to the provider directly. Requests go out through a
//! `ChatTransport` (HTTP in production) wrapped in a fixed-delay retry.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;
pub mod retry;

pub use retry::{retry_fixed, RetryPolicy};

/// Provider error codes that mean the account is out of quota or throttled.
const QUOTA_ERROR_CODES: &[&str] = &[
    "rate_limit_exceeded",
    "insufficient_quota",
    "429",
    "402",
];

/// Model families that accept `response_format: {"type": "json_object"}`.
const JSON_MODE_MODEL_PREFIXES: &[&str] = &["gpt-4o", "gpt-4.1", "gpt-4-turbo", "gpt-3.5-turbo"];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM request timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No API key configured for the LLM provider")]
    MissingApiKey,
}

impl LlmError {
    /// True when the provider rejected the call for quota or rate reasons,
    /// judged by status and documented error code only.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            LlmError::Api { status, code, .. } => {
                matches!(status, 429 | 402)
                    || code
                        .as_deref()
                        .is_some_and(|c| QUOTA_ERROR_CODES.contains(&c))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: &'static str,
}

/// One round trip to the chat-completion provider. Returns the decoded
/// response body of a successful call.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest<'_>) -> Result<Value, LlmError>;

    /// Whether credentials are present. Unconfigured transports are never called.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Error body documented by OpenAI-compatible providers:
/// `{"error": {"message": "...", "code": 429 | "insufficient_quota", "type": "..."}}`.
#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
    code: Option<Value>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl ProviderErrorBody {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => self.error_type.clone(),
        }
    }

    fn into_llm_error(self, status: u16) -> LlmError {
        LlmError::Api {
            status,
            code: self.code(),
            message: self
                .message
                .unwrap_or_else(|| "no message from provider".to_string()),
        }
    }
}

/// Maps a non-2xx response onto `LlmError::Api`, keeping the provider's
/// error code when the body follows the documented schema.
fn api_error(status: u16, body: &str) -> LlmError {
    match serde_json::from_str::<ProviderError>(body) {
        Ok(parsed) => parsed.error.into_llm_error(status),
        Err(_) => LlmError::Api {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Http(e)
    }
}

/// Bearer-token HTTP transport for OpenAI-compatible chat-completion APIs
/// (OpenRouter by default).
pub struct HttpTransport {
    client: Client,
    url: String,
    api_key: Option<String>,
    referer: String,
    title: String,
}

impl HttpTransport {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.llm_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: config.llm_api_url.clone(),
            api_key: config.api_key.clone(),
            referer: config.site_url.clone(),
            title: config.site_name.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest<'_>) -> Result<Value, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            warn!("LLM API returned {}: {}", status, body);
            return Err(api_error(status.as_u16(), &body));
        }

        let value: Value = serde_json::from_str(&body)?;

        // Some providers report upstream failures inside a 200 body.
        if value.get("choices").is_none() {
            if let Ok(parsed) = serde_json::from_value::<ProviderError>(value.clone()) {
                let status = parsed
                    .error
                    .code
                    .as_ref()
                    .and_then(Value::as_u64)
                    .and_then(|c| u16::try_from(c).ok())
                    .unwrap_or(502);
                return Err(parsed.error.into_llm_error(status));
            }
        }

        Ok(value)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// The LLM client used by the analysis pipeline.
#[derive(Clone)]
pub struct LlmClient {
    transport: Arc<dyn ChatTransport>,
    model: String,
    json_mode: bool,
    temperature: f32,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::from_config(config)?);
        let json_mode = config
            .llm_json_mode
            .unwrap_or_else(|| supports_json_mode(&config.llm_model));

        Ok(Self {
            transport,
            model: config.llm_model.clone(),
            json_mode,
            temperature: config.llm_temperature,
            retry: RetryPolicy {
                max_attempts: config.llm_max_attempts,
                delay: config.llm_retry_delay,
            },
        })
    }

    pub fn with_transport(
        transport: Arc<dyn ChatTransport>,
        model: impl Into<String>,
        json_mode: bool,
        temperature: f32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            model: model.into(),
            json_mode,
            temperature,
            retry,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn json_mode(&self) -> bool {
        self.json_mode
    }

    /// Completion options for a call capped at `max_tokens`.
    pub fn options(&self, max_tokens: u32) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens,
        }
    }

    /// Sends `prompt` as a single user message and returns the raw response body.
    /// Every failure is retried per the client's `RetryPolicy`; the last error
    /// is returned as-is.
    pub async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<Value, LlmError> {
        if !self.transport.is_configured() {
            return Err(LlmError::MissingApiKey);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: self.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let body = retry_fixed(self.retry, |attempt| {
            debug!(attempt, model = %self.model, "sending completion request");
            self.transport.send(&request)
        })
        .await?;

        if let Some(usage) = body.get("usage") {
            debug!(
                prompt_tokens = usage.get("prompt_tokens").and_then(|v| v.as_u64()),
                completion_tokens = usage.get("completion_tokens").and_then(|v| v.as_u64()),
                "LLM call succeeded"
            );
        }

        Ok(body)
    }
}

/// Whether `model` (optionally `provider/`-prefixed) accepts JSON response mode.
pub fn supports_json_mode(model: &str) -> bool {
    let name = model.rsplit('/').next().unwrap_or(model);
    JSON_MODE_MODEL_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}
