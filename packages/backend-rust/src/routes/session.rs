use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::extract::JsonBody;
use crate::response::AppError;
use crate::services::session::{
    self, LessonRecap, MistakeSummary, SessionTranscript, StartedSession, TutorReply,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    level: Option<String>,
    scenario: Option<String>,
    username: Option<String>,
}

/// Clients send the lesson id back either as the string they received or as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SessionIdValue {
    Text(String),
    Number(i64),
}

impl SessionIdValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    session_id: Option<SessionIdValue>,
    message: Option<String>,
    #[serde(default)]
    correct_immediately: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/message", post(send_message))
        .route("/:session_id", get(get_session))
        .route("/:session_id/mistakes", get(get_mistakes))
        .route("/:session_id/recap", get(get_recap))
}

async fn start_session(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<StartSessionRequest>,
) -> Result<Json<StartedSession>, AppError> {
    let db = state.require_db()?;
    let started = session::start_session(
        db.pool(),
        &state.tutor(),
        payload.level.as_deref(),
        payload.scenario.as_deref(),
        payload.username.as_deref(),
    )
    .await?;
    Ok(Json(started))
}

async fn send_message(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendMessageRequest>,
) -> Result<Json<TutorReply>, AppError> {
    let db = state.require_db()?;
    let session_id = payload
        .session_id
        .map(SessionIdValue::into_string)
        .unwrap_or_default();
    let reply = session::send_message(
        db.pool(),
        &state.tutor(),
        &session_id,
        payload.message.as_deref().unwrap_or_default(),
        payload.correct_immediately,
    )
    .await?;
    Ok(Json(reply))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionTranscript>, AppError> {
    let db = state.require_db()?;
    Ok(Json(session::get_session(db.pool(), &session_id).await?))
}

async fn get_mistakes(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<MistakeSummary>, AppError> {
    let db = state.require_db()?;
    Ok(Json(session::finish_session(db.pool(), &session_id).await?))
}

async fn get_recap(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<LessonRecap>, AppError> {
    let db = state.require_db()?;
    Ok(Json(
        session::session_recap(db.pool(), &state.tutor(), &session_id).await?,
    ))
}
