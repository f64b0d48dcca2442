use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_LLM_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:8080";

/// Application configuration loaded from environment variables.
/// Constructed once at startup and carried in `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream key. Optional so `/check-env` can report a missing key instead of
    /// the process refusing to start.
    pub api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_model: String,
    /// `None` = detect from the model name.
    pub llm_json_mode: Option<bool>,
    pub llm_temperature: f32,
    pub llm_timeout: Duration,
    pub llm_max_attempts: u32,
    pub llm_retry_delay: Duration,
    pub site_url: String,
    pub site_name: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub port: u16,
    pub dev_mode: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            api_key: optional_env("OPENROUTER_API_KEY"),
            llm_api_url: env_or("LLM_API_URL", DEFAULT_LLM_API_URL),
            llm_model: env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_json_mode: optional_env("LLM_JSON_MODE")
                .map(|v| parse_bool("LLM_JSON_MODE", &v))
                .transpose()?,
            llm_temperature: parse_env("LLM_TEMPERATURE", 0.7)?,
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 120)?),
            llm_max_attempts: parse_env("LLM_MAX_ATTEMPTS", 3)?,
            llm_retry_delay: Duration::from_millis(parse_env("LLM_RETRY_DELAY_MS", 1000)?),
            site_url: env_or("SITE_URL", "http://localhost:8080"),
            site_name: env_or("SITE_NAME", "ATS Resume Reviewer"),
            allowed_origins: split_origins(&env_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            rate_limit_max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS", 100)?,
            rate_limit_window: Duration::from_secs(parse_env("RATE_LIMIT_WINDOW_SECS", 15 * 60)?),
            port: parse_env("PORT", 5000)?,
            dev_mode: optional_env("DEV_MODE")
                .map(|v| parse_bool("DEV_MODE", &v))
                .transpose()?
                .unwrap_or(false),
            rust_log: env_or("RUST_LOG", "info"),
        };

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.llm_max_attempts == 0 {
            bail!("LLM_MAX_ATTEMPTS must be at least 1");
        }
        if self.rate_limit_max_requests == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS must be at least 1");
        }
        if self.rate_limit_window.is_zero() {
            bail!("RATE_LIMIT_WINDOW_SECS must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            bail!("LLM_TEMPERATURE must be between 0.0 and 2.0");
        }
        Ok(())
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Blank values are treated the same as unset ones.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Environment variable '{key}' must be a boolean, got '{raw}'"),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
impl Config {
    /// Defaults used by unit and router tests; no environment access.
    pub fn for_tests() -> Self {
        Config {
            api_key: Some("test-key".to_string()),
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_json_mode: None,
            llm_temperature: 0.7,
            llm_timeout: Duration::from_secs(120),
            llm_max_attempts: 3,
            llm_retry_delay: Duration::from_millis(1000),
            site_url: "http://localhost:8080".to_string(),
            site_name: "ATS Resume Reviewer".to_string(),
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            max_upload_bytes: 5 * 1024 * 1024,
            rate_limit_max_requests: 100,
            rate_limit_window: Duration::from_secs(15 * 60),
            port: 5000,
            dev_mode: false,
            rust_log: "info".to_string(),
        }
    }
}
