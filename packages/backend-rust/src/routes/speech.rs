use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::extract::JsonBody;
use crate::response::AppError;
use crate::services::ServiceError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SpeechRequest {
    text: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(text_to_speech))
}

async fn text_to_speech(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SpeechRequest>,
) -> Result<Response, AppError> {
    let text = payload
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::validation("Text is required"))?;

    let preview: String = text.chars().take(50).collect();
    tracing::info!(chars = text.chars().count(), %preview, "TTS request");

    let audio = state
        .tutor()
        .synthesize(&text)
        .await
        .map_err(ServiceError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::CONTENT_LENGTH, audio.len().to_string()),
        ],
        audio,
    )
        .into_response())
}
