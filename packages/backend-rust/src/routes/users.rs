use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::response::AppError;
use crate::services::profile::{self, LessonHistory, PracticedMistake, UserProfile};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:username/profile", get(get_profile))
        .route("/:username/lessons", get(get_lessons))
}

pub fn mistakes_router() -> Router<AppState> {
    Router::new().route("/:mistake_id/practiced", post(mark_practiced))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let db = state.require_db()?;
    Ok(Json(profile::user_profile(db.pool(), &username).await?))
}

async fn get_lessons(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<LessonHistory>, AppError> {
    let db = state.require_db()?;
    Ok(Json(profile::user_lessons(db.pool(), &username).await?))
}

async fn mark_practiced(
    State(state): State<AppState>,
    Path(mistake_id): Path<String>,
) -> Result<Json<PracticedMistake>, AppError> {
    let db = state.require_db()?;
    Ok(Json(profile::practice_mistake(db.pool(), &mistake_id).await?))
}
