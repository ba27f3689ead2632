use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use review_engine::ReviewError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Review(e @ (ReviewError::Replay(_) | ReviewError::InvalidFen(_))) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Review(e) => {
                tracing::error!("Review error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Anyhow(e) => {
                tracing::error!("Unexpected error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        // FastAPI-compatible error body: {"detail": "message"}
        (status, Json(json!({ "detail": message }))).into_response()
    }
}
