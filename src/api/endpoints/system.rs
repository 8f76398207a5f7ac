//! Health, status, and diagnostics endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::config::{APP_NAME, APP_VERSION};
use crate::pipeline::runner::{ModelProbe, ServiceAvailability};
use crate::state::AppState;
use crate::store::NoticeStore;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub app: &'static str,
    pub version: &'static str,
    pub services: ServiceAvailability,
    pub store_configured: bool,
    pub gemini_model: String,
    /// Absent when the store is unconfigured or unreachable.
    pub notice_count: Option<usize>,
}

/// `GET /api/health` — connection check for the dashboard.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: APP_VERSION,
    })
}

/// `GET /api/status` — which services this server came up with.
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let store_configured = state.store_configured();
    let notice_count = match state.store() {
        Ok(store) => match run_blocking(move || Ok(store.count()?)).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "could not count notices for status");
                None
            }
        },
        Err(_) => None,
    };

    Ok(Json(StatusResponse {
        app: APP_NAME,
        version: APP_VERSION,
        services: state.pipeline.availability(),
        store_configured,
        gemini_model: state.config.gemini_model.clone(),
        notice_count,
    }))
}

/// `GET /api/test-gemini` — one-shot model round trip.
pub async fn test_gemini(State(state): State<AppState>) -> Result<Json<ModelProbe>, ApiError> {
    let pipeline = state.pipeline.clone();
    let probe = run_blocking(move || Ok(pipeline.probe_model()?)).await?;
    Ok(Json(probe))
}
