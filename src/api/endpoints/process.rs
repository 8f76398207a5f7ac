//! Notice processing endpoints — image or text in, structured record out.
//!
//! The ephemeral routes run the pipeline and return the outcome; the
//! `-with-gemini` routes persist the record and its stage logs too.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::endpoints::run_blocking;
use crate::api::error::ApiError;
use crate::api::upload::staged_image;
use crate::models::{ExtractionResult, NoticeRecord, ProcessingLogEntry};
use crate::pipeline::runner::ProcessingOutcome;
use crate::state::AppState;
use crate::store::NoticeStore;

#[derive(Deserialize)]
pub struct TextPayload {
    pub text: String,
}

/// What the dashboard sends back once the operator has reviewed an
/// extraction. Field names arrive camelCase from the frontend.
#[derive(Deserialize)]
pub struct SaveNoticePayload {
    #[serde(alias = "rawText")]
    pub raw_text: String,
    #[serde(alias = "extractedData")]
    pub extracted_data: ExtractionResult,
    #[serde(default, alias = "confidenceScore")]
    pub confidence_score: Option<f64>,
    #[serde(default, alias = "elapsedMs")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, alias = "servicesUsed")]
    pub services_used: Vec<String>,
}

#[derive(Serialize)]
pub struct SaveNoticeResponse {
    pub success: bool,
    pub record: NoticeRecord,
}

#[derive(Serialize)]
pub struct RawTextResponse {
    pub raw_text: String,
    pub confidence: Option<f64>,
    pub elapsed_ms: u64,
}

/// `POST /api/process-notice` — OCR an uploaded image, extract and
/// refine fields, geocode the village. Nothing is persisted; the
/// dashboard shows the outcome for review first.
pub async fn process_notice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessingOutcome>, ApiError> {
    let image = staged_image(&mut multipart).await?;
    let pipeline = state.pipeline.clone();
    let outcome = run_blocking(move || Ok(pipeline.process_image(image.path())?)).await?;
    Ok(Json(outcome))
}

/// `POST /api/extract-raw-text` — OCR only, for checking scan quality.
pub async fn extract_raw_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RawTextResponse>, ApiError> {
    let image = staged_image(&mut multipart).await?;
    let pipeline = state.pipeline.clone();
    let ocr = run_blocking(move || Ok(pipeline.ocr_image(image.path())?)).await?;
    Ok(Json(RawTextResponse {
        raw_text: ocr.text,
        confidence: ocr.confidence,
        elapsed_ms: ocr.elapsed_ms,
    }))
}

/// `POST /api/process-with-gemini` — full pipeline on an uploaded
/// image, then persist the record with its stage logs.
pub async fn process_with_gemini(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessingOutcome>, ApiError> {
    let store = state.store()?;
    let image = staged_image(&mut multipart).await?;
    let pipeline = state.pipeline.clone();
    let outcome = run_blocking(move || {
        let mut outcome = pipeline.process_image(image.path())?;
        outcome.record = store.save(&outcome.record)?;
        append_stage_logs(store.as_ref(), &outcome);
        Ok(outcome)
    })
    .await?;
    Ok(Json(outcome))
}

/// `POST /api/process-text-with-gemini` — same pipeline minus OCR, for
/// text the dashboard already has.
pub async fn process_text_with_gemini(
    State(state): State<AppState>,
    Json(payload): Json<TextPayload>,
) -> Result<Json<ProcessingOutcome>, ApiError> {
    let store = state.store()?;
    let pipeline = state.pipeline.clone();
    let outcome = run_blocking(move || {
        let mut outcome = pipeline.process_text(&payload.text)?;
        outcome.record = store.save(&outcome.record)?;
        append_stage_logs(store.as_ref(), &outcome);
        Ok(outcome)
    })
    .await?;
    Ok(Json(outcome))
}

/// `POST /api/save-notice` — persist a reviewed extraction.
///
/// Responds as soon as the record is stored. Geocoding runs on a
/// detached blocking task afterwards and never delays or fails the
/// save; the stored record picks up coordinates when that pass lands.
pub async fn save_notice(
    State(state): State<AppState>,
    Json(payload): Json<SaveNoticePayload>,
) -> Result<Json<SaveNoticeResponse>, ApiError> {
    let store = state.store()?;
    let pipeline = state.pipeline.clone();

    let save_store = store.clone();
    let record = run_blocking(move || {
        let mut record = NoticeRecord::new(payload.raw_text);
        record.apply_extraction(&payload.extracted_data);
        if let Some(confidence) = payload.confidence_score {
            record.confidence_score = confidence.clamp(0.0, 1.0);
        }
        record.elapsed_ms = payload.elapsed_ms;
        record.services_used = payload.services_used;
        Ok(save_store.save(&record)?)
    })
    .await?;

    let mut background = record.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = pipeline.geocode_record(store.as_ref(), &mut background) {
            tracing::warn!(notice_id = %background.id, error = %e, "post-save geocoding failed");
        }
    });

    Ok(Json(SaveNoticeResponse {
        success: true,
        record,
    }))
}

/// Best-effort audit trail; a failed log write never fails the request
/// that produced the record.
fn append_stage_logs(store: &dyn NoticeStore, outcome: &ProcessingOutcome) {
    let id = outcome.record.id;
    let mut entries = Vec::new();
    if let Some(ocr) = &outcome.ocr {
        entries.push(ProcessingLogEntry::new(
            id,
            "ocr",
            format!("{} chars extracted", ocr.text_length),
        ));
    }
    entries.push(ProcessingLogEntry::new(
        id,
        "extracted",
        format!("confidence {:.2}", outcome.record.confidence_score),
    ));
    if outcome.refinement.applied {
        entries.push(ProcessingLogEntry::new(id, "refined", "refinement applied"));
    }
    if let Some(geocode) = &outcome.geocode {
        entries.push(ProcessingLogEntry::new(
            id,
            "geocoded",
            format!("status {}", geocode.status.as_str()),
        ));
    }
    for entry in entries {
        if let Err(e) = store.append_log(&entry) {
            tracing::warn!(notice_id = %id, error = %e, "could not append stage log");
        }
    }
}
