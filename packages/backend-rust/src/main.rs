use std::net::SocketAddr;
use std::sync::Arc;

use tutor_backend_rust::config::Config;
use tutor_backend_rust::db::Database;
use tutor_backend_rust::logging::init_tracing;
use tutor_backend_rust::services::tutor::Tutor;
use tutor_backend_rust::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    let db = match Database::from_env().await {
        Ok(db) => {
            tracing::info!(location = db.location(), "database ready");
            Some(db)
        }
        Err(err) => {
            tracing::warn!(error = %err, "database not initialized");
            None
        }
    };

    let tutor = Tutor::from_env();
    if !tutor.llm().is_available() {
        tracing::warn!("LLM_API_KEY not set, tutoring endpoints will fail");
    }

    let state = AppState::new(db.clone(), Arc::new(tutor));
    let app = tutor_backend_rust::build_app(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "tutor backend listening");

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, closing database pool");

    if let Some(db) = db {
        db.pool().close().await;
    }

    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
