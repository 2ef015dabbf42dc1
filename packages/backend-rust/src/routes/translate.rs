use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::Level;
use crate::extract::JsonBody;
use crate::response::AppError;
use crate::services::tutor::WordTranslation;
use crate::services::ServiceError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct WordRequest {
    word: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentenceRequest {
    sentence: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    text: Option<String>,
    level: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslationResponse {
    translation: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    words: Vec<WordTranslation>,
}

pub fn translate_router() -> Router<AppState> {
    Router::new()
        .route("/word", post(translate_word))
        .route("/sentence", post(translate_sentence))
}

pub fn analyze_router() -> Router<AppState> {
    Router::new().route("/words", post(analyze_words))
}

fn required(value: Option<String>, message: &'static str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(message))
}

async fn translate_word(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<WordRequest>,
) -> Result<Json<TranslationResponse>, AppError> {
    let word = required(payload.word, "Word is required")?;
    let translation = state
        .tutor()
        .translate_word(&word)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(TranslationResponse { translation }))
}

async fn translate_sentence(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SentenceRequest>,
) -> Result<Json<TranslationResponse>, AppError> {
    let sentence = required(payload.sentence, "Sentence is required")?;
    let translation = state
        .tutor()
        .translate_sentence(&sentence)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(TranslationResponse { translation }))
}

async fn analyze_words(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let text = required(payload.text, "Text is required")?;
    let level = match payload.level.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(raw) => Level::parse(raw).ok_or_else(|| AppError::validation("Invalid level"))?,
        None => Level::A1,
    };

    let words = state
        .tutor()
        .analyze_words(&text, level)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(AnalyzeResponse { words }))
}
