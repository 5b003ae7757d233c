use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facesift_photos::PhotoError;
use serde_json::json;

use crate::engine::EngineError;

/// Request failure, rendered as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Multipart(MultipartError),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Multipart(err) => (err.status(), err.body_text()),
            ApiError::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidUpload(e) => {
                ApiError::BadRequest(format!("uploaded file is not a readable image: {e}"))
            }
            EngineError::Photo(PhotoError::InvalidFilename(name)) => {
                ApiError::BadRequest(format!("invalid filename: {name:?}"))
            }
            EngineError::Photo(PhotoError::NotFound(name)) => {
                ApiError::NotFound(format!("photo not found: {name}"))
            }
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}
