use actix_web::error::{BlockingError, PayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::classifier::ClassifyError;
use crate::models::ErrorBody;
use crate::storage::StoreError;

/// Errors surfaced to HTTP clients. `Display` is the client-facing message;
/// the detailed cause stays in `source()` and the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image found")]
    EmptyUpload,
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Failed to read request body")]
    Payload(#[from] PayloadError),
    #[error("Failed to save image")]
    Save(#[source] StoreError),
    #[error("Failed to process image")]
    Decode(#[source] StoreError),
    #[error("Inference failed")]
    Inference(#[from] ClassifyError),
    #[error("Invalid request format")]
    InvalidServoRequest,
    #[error("Server error")]
    MalformedJson(#[from] serde_json::Error),
    #[error("Server error")]
    Blocking(#[from] BlockingError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Write { .. } => ApiError::Save(err),
            StoreError::Decode { .. } => ApiError::Decode(err),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::EmptyUpload
            | ApiError::PayloadTooLarge
            | ApiError::Payload(_)
            | ApiError::InvalidServoRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
