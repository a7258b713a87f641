use std::process::ExitCode;
use std::sync::Arc;

use axum::http::HeaderValue;
use tokio::signal;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod retry;
mod tts;

use api::routes::{create_router, AppState};
use config::{Config, ConfigError};
use error::StartupError;
use tts::{ParlerModel, TtsService};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    let cors_origin =
        HeaderValue::from_str(&config.cors_origin).map_err(|_| ConfigError::Invalid {
            name: "CORS_ORIGIN",
            expected: "a valid header value",
            value: config.cors_origin.clone(),
        })?;

    tracing::info!("Parler TTS Server v{}", env!("CARGO_PKG_VERSION"));

    // The listener only binds once the model is ready
    let model_config = config.model.clone();
    let policy = config.load_retry;
    let model = tokio::task::spawn_blocking(move || ParlerModel::load(&model_config, policy))
        .await
        .map_err(|e| StartupError::Loader(e.to_string()))??;

    let state = Arc::new(AppState {
        tts: TtsService::new(Arc::new(model)),
        max_text_chars: config.max_text_chars,
    });
    let app = create_router(state, cors_origin);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Starting TTS server on http://{}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
