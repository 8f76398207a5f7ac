//! Khatpatra digitizes Gujarati property-transfer notices.
//!
//! A scanned notice goes through Google Vision OCR, Gemini field
//! extraction and refinement, and Google Maps geocoding, then lands in
//! Firestore behind an axum dashboard API.

pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod store;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AppConfig;
use crate::state::AppState;

/// Read configuration, build clients, then serve until shutdown.
///
/// Synchronous on purpose: the Google clients are blocking `reqwest`
/// clients and must be constructed before the tokio runtime exists.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "khatpatra=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    tracing::info!("starting {} v{}", config::APP_NAME, config::APP_VERSION);

    let state = AppState::initialize(config);
    let addr = state.config.bind_addr();
    let app = api::notice_api_router(state);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("listening on {addr}");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok::<_, std::io::Error>(())
    })?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
