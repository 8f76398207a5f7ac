//! Notice-processing orchestrator.
//!
//! Single entry point that drives the full pipeline:
//! OCR → field extraction → refinement → geocoding → reconciliation.
//!
//! Every external service sits behind a trait object, and every one of
//! them is optional: the server starts with whatever credentials exist,
//! and an operation that needs an absent service fails with that
//! subsystem's configuration error on first use.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::models::{
    parse_notice_date, ExtractionResult, GeocodeResult, GeocodingStatus, NoticeRecord,
    ProcessingLogEntry,
};
use crate::pipeline::cleaner::clean_village_name;
use crate::pipeline::extract::prompt::TEST_PROMPT;
use crate::pipeline::extract::{
    extract_fields, refine_extraction, ExtractError, RefinementOutcome, TextModel,
};
use crate::pipeline::geo::{
    geocode_batch, geocode_village, reconcile, CoordinateEstimate, CoordinateSource, GeocodeApi,
    GeocodeError, VillageQuery,
};
use crate::pipeline::ocr::{read_notice_image, OcrError, OcrText, VisionOcr};
use crate::store::{NoticeStore, StoreError};

/// Confidence assumed when the model volunteers coordinates without
/// stating its own.
const MODEL_COORDINATE_FALLBACK_CONFIDENCE: f64 = 0.5;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Field extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No text supplied")]
    EmptyInput,
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Everything one processing run produced: the assembled (unsaved) record
/// plus per-stage summaries for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub record: NoticeRecord,
    /// Absent when processing started from supplied text.
    pub ocr: Option<OcrSummary>,
    pub refinement: RefinementSummary,
    /// Absent when neither the geocoder ran nor the model offered
    /// coordinates.
    pub geocode: Option<GeocodeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OcrSummary {
    pub confidence: Option<f64>,
    pub text_length: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinementSummary {
    pub applied: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeocodeSummary {
    pub status: GeocodingStatus,
    /// True only when geocoder and model coordinates agreed.
    pub verified: bool,
    pub source: Option<CoordinateSource>,
    pub distance_km: Option<f64>,
}

/// Which external services this process was started with.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceAvailability {
    pub vision: bool,
    pub gemini: bool,
    pub maps: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelProbe {
    pub model: String,
    pub reply: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeocodeSweepOutcome {
    pub scanned: usize,
    pub updated: usize,
    pub not_found: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RefineSweepOutcome {
    pub scanned: usize,
    pub refined: usize,
    pub unchanged: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives notice processing over injected service implementations.
///
/// Blocking throughout; the HTTP layer bridges to it with
/// `spawn_blocking`. Stage policy: OCR and extraction failures abort the
/// run, refinement and geocoding failures degrade the record instead.
pub struct NoticePipeline {
    vision: Option<Arc<dyn VisionOcr>>,
    model: Option<Arc<dyn TextModel>>,
    geocoder: Option<Arc<dyn GeocodeApi>>,
}

impl NoticePipeline {
    pub fn new(
        vision: Option<Arc<dyn VisionOcr>>,
        model: Option<Arc<dyn TextModel>>,
        geocoder: Option<Arc<dyn GeocodeApi>>,
    ) -> Self {
        Self {
            vision,
            model,
            geocoder,
        }
    }

    pub fn availability(&self) -> ServiceAvailability {
        ServiceAvailability {
            vision: self.vision.is_some(),
            gemini: self.model.is_some(),
            maps: self.geocoder.is_some(),
        }
    }

    fn vision(&self) -> Result<&dyn VisionOcr, OcrError> {
        self.vision.as_deref().ok_or(OcrError::Configuration)
    }

    fn model(&self) -> Result<&dyn TextModel, ExtractError> {
        self.model.as_deref().ok_or(ExtractError::Configuration)
    }

    fn geocoder(&self) -> Result<&dyn GeocodeApi, GeocodeError> {
        self.geocoder.as_deref().ok_or(GeocodeError::Configuration)
    }

    /// OCR only, for the raw-text endpoint.
    pub fn ocr_image(&self, path: &Path) -> Result<OcrText, OcrError> {
        read_notice_image(self.vision()?, path)
    }

    /// Full pipeline from a notice photograph.
    pub fn process_image(&self, path: &Path) -> Result<ProcessingOutcome, PipelineError> {
        let started = Instant::now();
        let ocr = self.ocr_image(path)?;
        let summary = OcrSummary {
            confidence: ocr.confidence,
            text_length: ocr.text.len(),
            elapsed_ms: ocr.elapsed_ms,
        };
        self.run(&ocr.text, Some(summary), started)
    }

    /// Full pipeline from already-transcribed text.
    pub fn process_text(&self, raw_text: &str) -> Result<ProcessingOutcome, PipelineError> {
        if raw_text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        self.run(raw_text, None, Instant::now())
    }

    /// Shared extraction → refinement → geocoding → reconciliation run.
    fn run(
        &self,
        raw_text: &str,
        ocr: Option<OcrSummary>,
        started: Instant,
    ) -> Result<ProcessingOutcome, PipelineError> {
        let model = self.model()?;
        let extraction = extract_fields(model, raw_text)?;
        let outcome = refine_extraction(model, raw_text, &extraction);

        let mut record = record_from_outcome(raw_text, &outcome);
        if ocr.is_some() {
            record.services_used.push("google_vision".into());
        }
        record.services_used.push("gemini".into());

        let geocode = self.locate(&mut record, model_estimate(&outcome));

        record.elapsed_ms = Some(started.elapsed().as_millis() as u64);

        tracing::info!(
            village = ?record.village_name,
            confidence = record.confidence_score,
            geocoding_status = record.geocoding_status.as_str(),
            elapsed_ms = ?record.elapsed_ms,
            "notice processed"
        );

        Ok(ProcessingOutcome {
            refinement: RefinementSummary {
                applied: outcome.applied,
                error: outcome.error.clone(),
            },
            record,
            ocr,
            geocode,
        })
    }

    /// Geocode the record's village and settle on final coordinates.
    ///
    /// Failures here degrade `geocoding_status` rather than failing the
    /// run; the extraction always survives this stage. With no geocoder
    /// configured the record stays `Pending` so the retro sweep can pick
    /// it up later.
    fn locate(
        &self,
        record: &mut NoticeRecord,
        model_estimate: Option<CoordinateEstimate>,
    ) -> Option<GeocodeSummary> {
        let village = record.village_name.clone();
        let geocode_result = match (self.geocoder.as_deref(), village) {
            (Some(api), Some(village)) => {
                record.services_used.push("google_maps".into());
                match geocode_village(api, &village, record.district.as_deref()) {
                    Ok(result) => Some(result),
                    Err(e) => {
                        tracing::warn!(error = %e, "geocoding stage failed");
                        Some(GeocodeResult::failed(
                            clean_village_name(&village),
                            e.to_string(),
                        ))
                    }
                }
            }
            (None, Some(_)) => {
                tracing::debug!("geocoder not configured, record left pending");
                None
            }
            _ => None,
        };

        if let Some(result) = &geocode_result {
            apply_geocode_fields(record, result);
        }

        let reconciled = reconcile(
            geocode_result.as_ref().and_then(geocoder_estimate),
            model_estimate,
        );
        if let Some(chosen) = &reconciled {
            record.latitude = Some(chosen.latitude);
            record.longitude = Some(chosen.longitude);
        }

        if geocode_result.is_none() && reconciled.is_none() {
            return None;
        }
        Some(GeocodeSummary {
            status: record.geocoding_status,
            verified: reconciled.as_ref().is_some_and(|r| r.verified),
            source: reconciled.as_ref().map(|r| r.source),
            distance_km: reconciled.as_ref().and_then(|r| r.distance_km),
        })
    }

    // -- Geocoding endpoints ------------------------------------------------

    pub fn geocode_one(&self, query: &VillageQuery) -> Result<GeocodeResult, GeocodeError> {
        geocode_village(self.geocoder()?, &query.village, query.district.as_deref())
    }

    pub fn geocode_many(
        &self,
        queries: &[VillageQuery],
        delay: Duration,
    ) -> Result<Vec<GeocodeResult>, GeocodeError> {
        Ok(geocode_batch(self.geocoder()?, queries, delay))
    }

    /// Geocode one stored record in place and persist the result.
    ///
    /// Runs as the background pass after a save and per record in the
    /// retro-geocode sweep. A missing geocoder or a record without a
    /// village leaves the record untouched; upstream geocoder errors
    /// degrade the status to `Failed`. Only store failures propagate.
    pub fn geocode_record(
        &self,
        store: &dyn NoticeStore,
        record: &mut NoticeRecord,
    ) -> Result<GeocodingStatus, StoreError> {
        let Ok(api) = self.geocoder() else {
            return Ok(record.geocoding_status);
        };
        let Some(village) = record.village_name.clone() else {
            return Ok(record.geocoding_status);
        };

        match geocode_village(api, &village, record.district.as_deref()) {
            Ok(result) => {
                apply_geocode_fields(record, &result);
                if result.success {
                    record.latitude = result.latitude;
                    record.longitude = result.longitude;
                    if !record.services_used.iter().any(|s| s == "google_maps") {
                        record.services_used.push("google_maps".into());
                    }
                }
            }
            Err(e) => {
                tracing::warn!(notice_id = %record.id, error = %e, "geocoding failed");
                record.geocoding_status = GeocodingStatus::Failed;
            }
        }
        let updated = store.update(record)?;
        *record = updated;

        let entry = ProcessingLogEntry::new(
            record.id,
            "geocoded",
            format!("status {}", record.geocoding_status.as_str()),
        );
        if let Err(e) = store.append_log(&entry) {
            tracing::warn!(notice_id = %record.id, error = %e, "could not log geocode result");
        }
        Ok(record.geocoding_status)
    }

    /// Retro-geocode every stored record that still lacks coordinates.
    pub fn geocode_missing(
        &self,
        store: &dyn NoticeStore,
        delay: Duration,
    ) -> Result<GeocodeSweepOutcome, PipelineError> {
        self.geocoder()?;
        let records = store.list_missing_coordinates()?;
        let mut outcome = GeocodeSweepOutcome {
            scanned: records.len(),
            updated: 0,
            not_found: 0,
            failed: 0,
        };

        for (index, mut record) in records.into_iter().enumerate() {
            if record.village_name.is_none() {
                continue;
            }
            if index > 0 && !delay.is_zero() {
                std::thread::sleep(delay);
            }
            match self.geocode_record(store, &mut record)? {
                GeocodingStatus::Success => outcome.updated += 1,
                GeocodingStatus::NotFound => outcome.not_found += 1,
                GeocodingStatus::Failed => outcome.failed += 1,
                GeocodingStatus::Pending => {}
            }
        }

        tracing::info!(
            scanned = outcome.scanned,
            updated = outcome.updated,
            not_found = outcome.not_found,
            failed = outcome.failed,
            "retro-geocode sweep complete"
        );
        Ok(outcome)
    }

    // -- Refinement endpoints -----------------------------------------------

    /// Refine a stored record in place.
    ///
    /// Model coordinates only fill a gap; coordinates already on the
    /// record stand.
    pub fn refine_record(
        &self,
        record: &mut NoticeRecord,
    ) -> Result<RefinementSummary, ExtractError> {
        let model = self.model()?;
        let current = extraction_from_record(record);
        let outcome = refine_extraction(model, &record.raw_text, &current);

        if outcome.applied {
            record.original_village_name = outcome.original_village_name.clone();
            record.original_survey_number = outcome.original_survey_number.clone();
            record.original_notice_date = outcome.original_notice_date.clone();
            record.village_name = outcome.result.village_name.clone();
            record.survey_number = outcome.result.survey_number.clone();
            if let Some(date) = outcome
                .result
                .notice_date
                .as_deref()
                .and_then(parse_notice_date)
            {
                record.notice_date = Some(date);
            }
            record.refinement_applied = true;

            if !record.has_coordinates() {
                if let Some(reconciled) = reconcile(None, model_estimate(&outcome)) {
                    record.latitude = Some(reconciled.latitude);
                    record.longitude = Some(reconciled.longitude);
                }
            }
        }

        Ok(RefinementSummary {
            applied: outcome.applied,
            error: outcome.error,
        })
    }

    /// Refine every stored record the refinement pass has not touched yet.
    pub fn refine_unrefined(
        &self,
        store: &dyn NoticeStore,
        limit: usize,
        delay: Duration,
    ) -> Result<RefineSweepOutcome, PipelineError> {
        self.model()?;
        let records = store.list(limit)?;
        let mut outcome = RefineSweepOutcome {
            scanned: records.len(),
            refined: 0,
            unchanged: 0,
            failed: 0,
        };

        let mut first = true;
        for mut record in records {
            if record.refinement_applied {
                continue;
            }
            if !first && !delay.is_zero() {
                std::thread::sleep(delay);
            }
            first = false;
            match self.refine_record(&mut record) {
                Ok(summary) if summary.applied => {
                    store.update(&record)?;
                    outcome.refined += 1;
                }
                Ok(_) => outcome.unchanged += 1,
                Err(e) => {
                    tracing::warn!(notice_id = %record.id, error = %e, "refine sweep entry failed");
                    outcome.failed += 1;
                }
            }
        }

        tracing::info!(
            scanned = outcome.scanned,
            refined = outcome.refined,
            "refinement sweep complete"
        );
        Ok(outcome)
    }

    // -- Diagnostics --------------------------------------------------------

    /// One-shot model round trip for the diagnostics endpoint.
    pub fn probe_model(&self) -> Result<ModelProbe, ExtractError> {
        let model = self.model()?;
        let reply = model.generate(TEST_PROMPT)?;
        Ok(ModelProbe {
            model: model.model_name().to_string(),
            reply,
        })
    }
}

// ---------------------------------------------------------------------------
// Record assembly
// ---------------------------------------------------------------------------

fn record_from_outcome(raw_text: &str, outcome: &RefinementOutcome) -> NoticeRecord {
    let mut record = NoticeRecord::new(raw_text);
    record.apply_extraction(&outcome.result);
    record.refinement_applied = outcome.applied;
    if outcome.applied {
        record.original_village_name = outcome.original_village_name.clone();
        record.original_survey_number = outcome.original_survey_number.clone();
        record.original_notice_date = outcome.original_notice_date.clone();
    }
    record
}

fn extraction_from_record(record: &NoticeRecord) -> ExtractionResult {
    ExtractionResult {
        village_name: record.village_name.clone(),
        survey_number: record.survey_number.clone(),
        buyer_name: record.buyer_name.clone(),
        seller_name: record.seller_name.clone(),
        notice_date: record.notice_date.map(|d| d.format("%d/%m/%Y").to_string()),
        advocate_name: record.advocate_name.clone(),
        advocate_address: record.advocate_address.clone(),
        advocate_mobile: record.advocate_mobile.clone(),
        district: record.district.clone(),
        taluka: record.taluka.clone(),
        land_area: record.land_area.clone(),
        confidence: record.confidence_score,
        notes: None,
    }
}

/// Copy the non-coordinate geocode outputs onto the record. Coordinates
/// go through reconciliation, not here.
fn apply_geocode_fields(record: &mut NoticeRecord, result: &GeocodeResult) {
    record.geocoding_status = result.status;
    if !result.success {
        return;
    }
    record.formatted_address = result.formatted_address.clone();
    // Backfill administrative fields the extractor could not read; never
    // overwrite what the notice itself said.
    if record.district.is_none() {
        record.district = result.district.clone();
    }
    if record.taluka.is_none() {
        record.taluka = result.taluka.clone();
    }
}

fn geocoder_estimate(result: &GeocodeResult) -> Option<CoordinateEstimate> {
    match (result.latitude, result.longitude) {
        (Some(latitude), Some(longitude)) if result.success => Some(CoordinateEstimate {
            latitude,
            longitude,
            confidence: result.confidence,
        }),
        _ => None,
    }
}

fn model_estimate(outcome: &RefinementOutcome) -> Option<CoordinateEstimate> {
    match (outcome.latitude, outcome.longitude) {
        (Some(latitude), Some(longitude)) => Some(CoordinateEstimate {
            latitude,
            longitude,
            confidence: outcome
                .confidence
                .unwrap_or(MODEL_COORDINATE_FALLBACK_CONFIDENCE),
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
