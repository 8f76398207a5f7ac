//! Geocoding endpoints: single village, ad-hoc batch, retro sweep.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::config::GEOCODE_BATCH_DELAY_MS;
use crate::models::GeocodeResult;
use crate::pipeline::geo::VillageQuery;
use crate::pipeline::runner::GeocodeSweepOutcome;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BatchPayload {
    pub villages: Vec<VillageQuery>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub results: Vec<GeocodeResult>,
    pub total: usize,
}

/// `POST /api/geocode/village` — geocode one village name.
pub async fn village(
    State(state): State<AppState>,
    Json(query): Json<VillageQuery>,
) -> Result<Json<GeocodeResult>, ApiError> {
    let pipeline = state.pipeline.clone();
    let result = run_blocking(move || Ok(pipeline.geocode_one(&query)?)).await?;
    Ok(Json(result))
}

/// `POST /api/geocode/batch` — geocode a list of villages, rate-limited
/// between lookups.
pub async fn batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchPayload>,
) -> Result<Json<BatchResponse>, ApiError> {
    if payload.villages.is_empty() {
        return Err(ApiError::BadRequest("No villages supplied".into()));
    }
    let pipeline = state.pipeline.clone();
    let results = run_blocking(move || {
        Ok(pipeline.geocode_many(
            &payload.villages,
            Duration::from_millis(GEOCODE_BATCH_DELAY_MS),
        )?)
    })
    .await?;
    let total = results.len();
    Ok(Json(BatchResponse { results, total }))
}

/// `POST /api/geocode/existing` — retro-geocode every stored notice
/// that still lacks coordinates.
pub async fn existing(
    State(state): State<AppState>,
) -> Result<Json<GeocodeSweepOutcome>, ApiError> {
    let store = state.store()?;
    let pipeline = state.pipeline.clone();
    let outcome = run_blocking(move || {
        Ok(pipeline.geocode_missing(
            store.as_ref(),
            Duration::from_millis(GEOCODE_BATCH_DELAY_MS),
        )?)
    })
    .await?;
    Ok(Json(outcome))
}
