use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single text-generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response contained no text")]
    EmptyResponse,

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GenerationError {
    /// The backend does not know the requested model, so another one may be tried.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, GenerationError::Api { status: 404, .. })
    }
}

/// Request rejections surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("query parameter 'q' must not be empty")]
    MissingQuery,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingQuery => StatusCode::BAD_REQUEST,
        };

        (
            status,
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
