//! Second-pass refinement of the location-critical fields.
//!
//! A narrow prompt re-reads the notice and corrects village, survey number
//! and date, optionally volunteering coordinates. Refinement must never
//! lose data: any failure propagates the original extraction untouched
//! with the failure recorded on the outcome.

use crate::models::ExtractionResult;

use super::gemini::TextModel;
use super::parser::{json_object_from_reply, number_field, string_field};
use super::prompt::build_refinement_prompt;
use super::village::postprocess_village_name;

/// What the refinement pass produced, stated explicitly: the resulting
/// fields, whether anything was applied, the pre-refinement values for
/// audit, and coordinates when the model offered them.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub result: ExtractionResult,
    pub applied: bool,
    pub original_village_name: Option<String>,
    pub original_survey_number: Option<String>,
    pub original_notice_date: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub confidence: Option<f64>,
    pub error: Option<String>,
}

impl RefinementOutcome {
    fn not_applied(original: ExtractionResult, error: String) -> Self {
        RefinementOutcome {
            result: original,
            applied: false,
            original_village_name: None,
            original_survey_number: None,
            original_notice_date: None,
            latitude: None,
            longitude: None,
            confidence: None,
            error: Some(error),
        }
    }
}

/// Run the refinement pass over an existing extraction.
pub fn refine_extraction(
    model: &dyn TextModel,
    raw_text: &str,
    original: &ExtractionResult,
) -> RefinementOutcome {
    let _span = tracing::info_span!("refinement", model = %model.model_name()).entered();

    let prompt = build_refinement_prompt(raw_text, original);
    let reply = match model.generate(&prompt) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "refinement model call failed");
            return RefinementOutcome::not_applied(original.clone(), e.to_string());
        }
    };

    let Some(value) = json_object_from_reply(&reply) else {
        tracing::warn!("refinement reply was not parseable JSON");
        return RefinementOutcome::not_applied(
            original.clone(),
            "refinement reply was not parseable JSON".into(),
        );
    };

    let mut result = original.clone();
    if let Some(village) = string_field(&value, "village_name") {
        result.village_name = Some(postprocess_village_name(&village));
    }
    if let Some(survey) = string_field(&value, "survey_number") {
        result.survey_number = Some(survey);
    }
    if let Some(date) = string_field(&value, "notice_date") {
        result.notice_date = Some(date);
    }

    let (latitude, longitude) = paired_coordinates(
        number_field(&value, "latitude"),
        number_field(&value, "longitude"),
    );

    let confidence = number_field(&value, "confidence").map(|c| c.clamp(0.0, 1.0));

    tracing::info!(
        village = ?result.village_name,
        has_coordinates = latitude.is_some(),
        "refinement applied"
    );

    RefinementOutcome {
        result,
        applied: true,
        original_village_name: original.village_name.clone(),
        original_survey_number: original.survey_number.clone(),
        original_notice_date: original.notice_date.clone(),
        latitude,
        longitude,
        confidence,
        error: None,
    }
}

/// Coordinates are only usable as a pair, and only when they are actually
/// on the globe.
fn paired_coordinates(lat: Option<f64>, lng: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (lat, lng) {
        (Some(lat), Some(lng))
            if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) =>
        {
            (Some(lat), Some(lng))
        }
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::gemini::MockTextModel;
    use crate::pipeline::extract::ExtractError;

    fn original() -> ExtractionResult {
        ExtractionResult {
            village_name: Some("રીબડ".into()),
            survey_number: Some("367".into()),
            notice_date: Some("18/07/2025".into()),
            buyer_name: Some("પટેલ રમેશભાઈ".into()),
            confidence: 0.6,
            ..ExtractionResult::default()
        }
    }

    #[test]
    fn successful_refinement_unions_fields_and_keeps_originals() {
        let model = MockTextModel::new(
            r#"{"village_name": "રીબડા", "survey_number": "૩૬૭", "notice_date": null,
                "latitude": 21.98, "longitude": 70.79, "confidence": 0.85}"#,
        );
        let outcome = refine_extraction(&model, "notice text", &original());

        assert!(outcome.applied);
        assert!(outcome.error.is_none());
        // Refined values replace, nulls leave the original in place.
        assert_eq!(outcome.result.village_name.as_deref(), Some("રીબડા"));
        assert_eq!(outcome.result.survey_number.as_deref(), Some("૩૬૭"));
        assert_eq!(outcome.result.notice_date.as_deref(), Some("18/07/2025"));
        // Untouched fields survive.
        assert_eq!(outcome.result.buyer_name.as_deref(), Some("પટેલ રમેશભાઈ"));
        // Audit trail.
        assert_eq!(outcome.original_village_name.as_deref(), Some("રીબડ"));
        assert_eq!(outcome.original_survey_number.as_deref(), Some("367"));
        assert_eq!(outcome.latitude, Some(21.98));
        assert_eq!(outcome.longitude, Some(70.79));
        assert_eq!(outcome.confidence, Some(0.85));
    }

    #[test]
    fn unparseable_reply_propagates_original_untouched() {
        let model = MockTextModel::new("The village appears to be Ribda.");
        let before = original();
        let outcome = refine_extraction(&model, "notice text", &before);

        assert!(!outcome.applied);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.result.village_name, before.village_name);
        assert_eq!(outcome.result.survey_number, before.survey_number);
        assert_eq!(outcome.result.notice_date, before.notice_date);
        assert_eq!(outcome.latitude, None);
    }

    #[test]
    fn model_failure_propagates_original_with_error() {
        struct FailingModel;
        impl TextModel for FailingModel {
            fn generate(&self, _prompt: &str) -> Result<String, ExtractError> {
                Err(ExtractError::Connection("https://example.invalid".into()))
            }
            fn model_name(&self) -> &str {
                "failing"
            }
        }

        let outcome = refine_extraction(&FailingModel, "text", &original());
        assert!(!outcome.applied);
        assert!(outcome.error.as_deref().unwrap().contains("example.invalid"));
        assert_eq!(outcome.result.village_name.as_deref(), Some("રીબડ"));
    }

    #[test]
    fn lone_latitude_is_dropped() {
        let model =
            MockTextModel::new(r#"{"village_name": "રીબડા", "latitude": 21.98, "confidence": 0.8}"#);
        let outcome = refine_extraction(&model, "text", &original());
        assert!(outcome.applied);
        assert_eq!(outcome.latitude, None);
        assert_eq!(outcome.longitude, None);
    }

    #[test]
    fn off_globe_coordinates_are_dropped() {
        let model = MockTextModel::new(
            r#"{"latitude": 211.0, "longitude": 70.0, "confidence": 0.8}"#,
        );
        let outcome = refine_extraction(&model, "text", &original());
        assert_eq!(outcome.latitude, None);
        assert_eq!(outcome.longitude, None);
    }

    #[test]
    fn refined_village_is_postprocessed() {
        let model = MockTextModel::new(
            r#"{"village_name": "ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭", "confidence": 0.7}"#,
        );
        let outcome = refine_extraction(&model, "text", &original());
        assert_eq!(outcome.result.village_name.as_deref(), Some("રીબડા"));
    }
}
