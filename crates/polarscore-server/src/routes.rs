//! HTTP routes and handlers

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, Uri},
    routing::{delete, get, post},
    Json, Router,
};
use polarscore_core::{Error, ScoreRequestBody, ScoreResponse};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::AppError;
use crate::state::AppState;

pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", post(score))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/cache", delete(clear_cache))
        .fallback(fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Score the request text with the requested model
///
/// The body is parsed regardless of content type. Loading and the forward
/// pass run on the blocking pool.
async fn score(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ScoreResponse>, AppError> {
    metrics::counter!("polarscore_requests_total").increment(1);

    let body: ScoreRequestBody = serde_json::from_slice(&body)
        .map_err(|e| Error::validation(format!("Invalid request body: {}", e)))?;
    let request = state.defaults.resolve(body)?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("score", %request_id, model = %request.model_path());
    debug!(parent: &span, "Scoring {} chars", request.text().len());

    let scorer = state.scorer.clone();
    let outcome = tokio::task::spawn_blocking(move || span.in_scope(|| scorer.score(&request)))
        .await
        .map_err(|e| AppError::Worker(e.to_string()))??;

    metrics::histogram!("polarscore_score_latency_us")
        .record((outcome.load_us + outcome.inference_us) as f64);
    debug!(
        %request_id,
        "Score {:.6} (load {}us, inference {}us)",
        outcome.score,
        outcome.load_us,
        outcome.inference_us
    );

    Ok(Json(outcome.response()))
}

/// Drop every cached model
async fn clear_cache(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let loader = state.scorer.loader().clone();
    let released = tokio::task::spawn_blocking(move || loader.clear())
        .await
        .map_err(|e| AppError::Worker(e.to_string()))?;

    info!("Cache cleared, {} models released", released);
    Ok(StatusCode::NO_CONTENT)
}

async fn fallback(uri: Uri) -> AppError {
    AppError::RouteNotFound(uri.path().to_string())
}
