use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::HealthResponse;
use crate::api::routes::AppState;
use crate::error::{AppError, SynthesisError};

const PREVIEW_CHARS: usize = 100;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "TTS server is running",
    })
}

pub async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    tracing::info!("Received request");

    let body = body.map_err(|rejection| {
        tracing::warn!("Failed to read request body: {}", rejection.body_text());
        AppError::UnreadableBody(rejection.status(), rejection.body_text())
    })?;

    let text = extract_text(&headers, &body)?;

    if let Some(max) = state.max_text_chars {
        if text.chars().count() > max {
            return Err(AppError::TextTooLong(max));
        }
    }

    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
    tracing::info!("Processing text: {}...", preview);

    let wav = tokio::task::spawn_blocking(move || state.tts.speak(&text))
        .await
        .map_err(|e| SynthesisError::Worker(e.to_string()))??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"speech.wav\""),
        ],
        wav,
    )
        .into_response())
}

/// Pull a non-empty `text` string out of a JSON request body.
fn extract_text(headers: &HeaderMap, body: &[u8]) -> Result<String, AppError> {
    if !is_json(headers) {
        return Err(AppError::BadRequest("Request must be JSON"));
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|_| AppError::BadRequest("Request must be JSON"))?;

    match value.get("text").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(AppError::BadRequest("No text provided")),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}
