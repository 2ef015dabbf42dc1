use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::db::HealthCheckResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HealthCheckResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    start_time: String,
    uptime: u64,
    llm_configured: bool,
    native_language: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

async fn root(State(state): State<AppState>) -> Response {
    let check = match state.db() {
        Some(db) => Some(db.ping().await),
        None => None,
    };
    let ok = check.as_ref().is_some_and(|c| c.healthy);

    if let Some(error) = check.as_ref().and_then(|c| c.error.as_deref()) {
        tracing::warn!(%error, "database health check failed");
    }

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        database: if ok { "connected" } else { "disconnected" },
        timestamp: now_iso(),
        details: check,
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let tutor = state.tutor();
    Json(HealthInfoResponse {
        service: "english-tutor-backend",
        version: env!("CARGO_PKG_VERSION"),
        start_time: DateTime::<Utc>::from(state.started_at_system())
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
        llm_configured: tutor.llm().is_available(),
        native_language: tutor.native_language().to_string(),
    })
    .into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
