use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::rate_limit::RequestLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once at startup; nothing in it is mutated per request except the
/// limiter's internal counters.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: LlmClient,
    pub limiter: Arc<RequestLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let llm = LlmClient::from_config(&config)?;
        let limiter = RequestLimiter::new(config.rate_limit_max_requests, config.rate_limit_window)?;
        Ok(Self::from_parts(config, llm, limiter))
    }

    pub fn from_parts(config: Config, llm: LlmClient, limiter: RequestLimiter) -> Self {
        Self {
            config: Arc::new(config),
            llm,
            limiter: Arc::new(limiter),
        }
    }
}
