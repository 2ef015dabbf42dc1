mod health;
mod session;
mod speech;
mod translate;
mod users;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/test", get(api_test))
        .nest("/health", health::router())
        .nest("/api/session", session::router())
        .nest("/api/user", users::router())
        .nest("/api/mistakes", users::mistakes_router())
        .nest("/api/tts", speech::router())
        .nest("/api/translate", translate::translate_router())
        .nest("/api/analyze", translate::analyze_router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn root() -> Response {
    Json(json!({
        "message": "English Tutor API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "test": "/api/test",
            "startSession": "/api/session/start",
            "sendMessage": "/api/session/message",
            "getSession": "/api/session/:sessionId",
            "getMistakes": "/api/session/:sessionId/mistakes",
            "getRecap": "/api/session/:sessionId/recap",
            "getUserProfile": "/api/user/:username/profile",
            "getUserLessons": "/api/user/:username/lessons",
            "markMistakePracticed": "/api/mistakes/:mistakeId/practiced",
            "tts": "/api/tts",
            "translateWord": "/api/translate/word",
            "translateSentence": "/api/translate/sentence",
            "analyzeWords": "/api/analyze/words"
        }
    }))
    .into_response()
}

async fn api_test() -> Response {
    Json(json!({ "message": "Backend is running!" })).into_response()
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Endpoint not found").into_response()
}
