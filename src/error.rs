use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::ConfigError;

/// Errors raised while turning text into audio.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Tokenization failed: {0}")]
    Tokenize(String),

    #[error("Generation failed: {0}")]
    Generate(#[from] candle_core::Error),

    #[error("Failed to encode WAV: {0}")]
    Encode(#[from] hound::Error),

    #[error("Synthesis worker failed: {0}")]
    Worker(String),
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Text too long (max {0} chars)")]
    TextTooLong(usize),

    /// The body could not be read; keeps the status axum chose for the rejection.
    #[error("{1}")]
    UnreadableBody(StatusCode, String),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

/// Failures that abort startup before the listener binds.
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch {file} from {repo}: {reason}")]
    Download {
        repo: String,
        file: String,
        reason: String,
    },

    #[error("Model file not found: {0}")]
    MissingLocalFile(std::path::PathBuf),

    #[error("Failed to read model config: {0}")]
    ModelConfig(#[from] serde_json::Error),

    #[error("Failed to build model: {0}")]
    Model(#[from] candle_core::Error),

    #[error("Failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model loader task failed: {0}")]
    Loader(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::TextTooLong(_) => StatusCode::BAD_REQUEST,
            AppError::UnreadableBody(status, _) => *status,
            AppError::Synthesis(e) => {
                tracing::error!(error = ?e, "Error in text_to_speech: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
