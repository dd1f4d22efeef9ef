// src/errors.rs
use crate::services::vision_client::VisionError;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Quota error: {0}")]
    Quota(String),

    #[error("Analysis failed after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: String },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<VisionError> for AnalysisError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::InvalidImage(msg) => AnalysisError::Validation(msg),
            VisionError::Auth(msg) => AnalysisError::Auth(msg),
            VisionError::RateLimited => AnalysisError::Quota("rate limited".to_string()),
            VisionError::Quota(msg) => AnalysisError::Quota(msg),
            other => AnalysisError::Transport(other.to_string()),
        }
    }
}

impl ResponseError for AnalysisError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::Validation(_) | AnalysisError::ImageProcessing(_) => {
                StatusCode::BAD_REQUEST
            }
            AnalysisError::Auth(_) => StatusCode::BAD_GATEWAY,
            AnalysisError::Quota(_) => StatusCode::TOO_MANY_REQUESTS,
            AnalysisError::Transport(_) | AnalysisError::ExhaustedRetries { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AnalysisError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            AnalysisError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalysisError::Redis(_) | AnalysisError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let label = match self {
            AnalysisError::Validation(_) => "Validation error",
            AnalysisError::ImageProcessing(_) => "Image processing error",
            AnalysisError::Transport(_) => "AI service unavailable",
            AnalysisError::Auth(_) => "AI service credential error",
            AnalysisError::Quota(_) => "AI service quota exceeded",
            AnalysisError::ExhaustedRetries { .. } => "AI service error",
            AnalysisError::Cancelled => "Request cancelled",
            AnalysisError::NotFound(_) => "Not found",
            AnalysisError::Redis(_) => "Database error",
            AnalysisError::Serialization(_) => "Data processing error",
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": label,
            "message": self.to_string()
        }))
    }
}
