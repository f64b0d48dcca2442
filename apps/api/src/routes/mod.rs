pub mod health;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::analysis::handlers;
use crate::errors::expose_error_traces;
use crate::rate_limit::enforce_rate_limit;
use crate::state::AppState;

/// Room for multipart boundaries and the job-description field on top of the
/// file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    let api = Router::new()
        .route(
            "/analyze",
            post(handlers::handle_analyze).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/analyze-improvements", post(handlers::handle_improvements))
        .route("/analyze-job-alignment", post(handlers::handle_job_alignment))
        .route("/check-env", get(health::check_env_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ));

    let router = Router::new()
        .route("/health", get(health::health_handler))
        .merge(api);

    let router = if state.config.dev_mode {
        router.layer(middleware::from_fn(expose_error_traces))
    } else {
        router
    };

    router.with_state(state)
}

/// CORS restricted to the configured origins, with credentials allowed.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid origin '{origin}' in ALLOWED_ORIGINS"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}
