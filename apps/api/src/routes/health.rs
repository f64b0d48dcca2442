use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckEnvResponse {
    pub api_key_configured: bool,
    pub site_url: String,
    pub site_name: String,
}

/// GET /check-env
/// Reports whether the upstream API key is set. Never echoes the key itself.
pub async fn check_env_handler(State(state): State<AppState>) -> Json<CheckEnvResponse> {
    Json(CheckEnvResponse {
        api_key_configured: state.config.api_key_configured(),
        site_url: state.config.site_url.clone(),
        site_name: state.config.site_name.clone(),
    })
}
