use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::image_client::ImageGenError;
use crate::iris::overlay::OverlayError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Image provider call failed: {0}")]
    UpstreamCall(String),

    #[error("Image provider returned no image data")]
    UpstreamEmptyResponse,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Composite error: {0}")]
    Composite(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ImageGenError> for AppError {
    fn from(err: ImageGenError) -> Self {
        match err {
            ImageGenError::EmptyResponse => AppError::UpstreamEmptyResponse,
            other => AppError::UpstreamCall(other.to_string()),
        }
    }
}

impl From<OverlayError> for AppError {
    fn from(err: OverlayError) -> Self {
        match err {
            OverlayError::Decode(msg) => AppError::Decode(msg),
            OverlayError::Composite(msg) => AppError::Composite(msg),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UpstreamCall(_) | AppError::UpstreamEmptyResponse => StatusCode::BAD_GATEWAY,
            AppError::Decode(_) | AppError::Composite(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::InvalidInput(msg) => ("INVALID_INPUT", msg.clone()),
            AppError::PayloadTooLarge(msg) => ("PAYLOAD_TOO_LARGE", msg.clone()),
            AppError::UpstreamCall(msg) => {
                tracing::error!("Image provider error: {msg}");
                ("UPSTREAM_CALL_FAILED", format!("Image generation failed: {msg}"))
            }
            AppError::UpstreamEmptyResponse => {
                tracing::error!("Image provider returned no image data");
                (
                    "UPSTREAM_EMPTY_RESPONSE",
                    "The image provider returned no image".to_string(),
                )
            }
            AppError::Decode(msg) => {
                tracing::error!("Generated image decode error: {msg}");
                (
                    "DECODE_ERROR",
                    "The generated image could not be decoded".to_string(),
                )
            }
            AppError::Composite(msg) => {
                tracing::error!("Pupil composite error: {msg}");
                (
                    "COMPOSITE_ERROR",
                    "The pupil overlay could not be applied".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
