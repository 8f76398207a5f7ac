//! Refinement endpoints: second-pass extraction on stored notices.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::config::{DEFAULT_LIST_LIMIT, REFINE_BATCH_DELAY_MS};
use crate::models::{NoticeRecord, ProcessingLogEntry};
use crate::pipeline::runner::{RefineSweepOutcome, RefinementSummary};
use crate::state::AppState;
use crate::store::NoticeStore;

#[derive(Deserialize)]
pub struct RefineBatchPayload {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct RefineResponse {
    pub record: NoticeRecord,
    pub refinement: RefinementSummary,
}

/// `POST /api/refine-notice/:id` — re-run refinement on one stored
/// notice and persist whatever changed.
pub async fn refine_notice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefineResponse>, ApiError> {
    let store = state.store()?;
    let pipeline = state.pipeline.clone();
    let (record, refinement) = run_blocking(move || {
        let mut record = store
            .get(&id)?
            .ok_or_else(|| ApiError::NotFound(format!("Notice {id} not found")))?;
        let refinement = pipeline.refine_record(&mut record)?;
        let record = store.update(&record)?;
        if refinement.applied {
            let entry = ProcessingLogEntry::new(record.id, "refined", "refinement applied");
            if let Err(e) = store.append_log(&entry) {
                tracing::warn!(notice_id = %record.id, error = %e, "could not log refinement");
            }
        }
        Ok((record, refinement))
    })
    .await?;
    Ok(Json(RefineResponse { record, refinement }))
}

/// `POST /api/refine-batch` — refine stored notices that have not been
/// refined yet, rate-limited between model calls.
pub async fn refine_batch(
    State(state): State<AppState>,
    payload: Option<Json<RefineBatchPayload>>,
) -> Result<Json<RefineSweepOutcome>, ApiError> {
    let store = state.store()?;
    let pipeline = state.pipeline.clone();
    let limit = payload
        .and_then(|Json(p)| p.limit)
        .unwrap_or(DEFAULT_LIST_LIMIT);
    let outcome = run_blocking(move || {
        Ok(pipeline.refine_unrefined(
            store.as_ref(),
            limit,
            Duration::from_millis(REFINE_BATCH_DELAY_MS),
        )?)
    })
    .await?;
    Ok(Json(outcome))
}
