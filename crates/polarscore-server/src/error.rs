//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use polarscore_core::Error;
use serde_json::json;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Score(#[from] Error),

    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("Scoring worker failed: {0}")]
    Worker(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Score(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Score(Error::ModelNotFound(_)) | Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::Score(Error::ModelFormat(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Score(_) | Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value of the `type` field in the error body
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Score(err) => err.kind(),
            Self::RouteNotFound(_) => "not_found",
            Self::Worker(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", kind, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", kind, self);
        }
        metrics::counter!("polarscore_errors_total", "type" => kind).increment(1);

        let body = json!({
            "error": {
                "message": self.to_string(),
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
