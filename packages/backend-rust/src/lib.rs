pub mod config;
pub mod db;
pub mod domain;
pub mod extract;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::tutor::Tutor;
use crate::state::AppState;

/// Router with the HTTP layers every deployment runs with.
pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Wires the app from environment configuration. A database that fails to open
/// is logged and leaves the data routes answering 503.
pub async fn create_app() -> axum::Router {
    let db = match db::Database::from_env().await {
        Ok(db) => Some(db),
        Err(err) => {
            tracing::warn!(error = %err, "database not initialized");
            None
        }
    };

    let state = AppState::new(db, Arc::new(Tutor::from_env()));
    build_app(state)
}
