//! Field extraction: one model call, the parse ladder, village cleanup.

use crate::models::ExtractionResult;

use super::gemini::TextModel;
use super::parser::parse_extraction_reply;
use super::prompt::build_extraction_prompt;
use super::village::postprocess_village_name;
use super::ExtractError;

/// Extract the structured fields from one notice's OCR text.
///
/// Exactly one model call, no retry. Parse failures degrade to the all-null
/// low-confidence result instead of erroring; only transport and upstream
/// failures surface as errors.
pub fn extract_fields(model: &dyn TextModel, raw_text: &str) -> Result<ExtractionResult, ExtractError> {
    let _span = tracing::info_span!(
        "field_extraction",
        model = %model.model_name(),
        text_len = raw_text.len(),
    )
    .entered();
    let start = std::time::Instant::now();

    let prompt = build_extraction_prompt(raw_text);
    let reply = model.generate(&prompt)?;

    let mut result = parse_extraction_reply(&reply);
    if let Some(village) = result.village_name.take() {
        result.village_name = Some(postprocess_village_name(&village));
    }
    result.clamp_confidence();

    tracing::info!(
        elapsed_ms = %start.elapsed().as_millis(),
        confidence = result.confidence,
        village = ?result.village_name,
        "Field extraction complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::extraction::PARSE_FAILURE_CONFIDENCE;
    use crate::pipeline::extract::gemini::MockTextModel;
    use std::sync::Mutex;

    #[test]
    fn extracts_fields_from_clean_reply() {
        let model = MockTextModel::new(
            r#"{"village_name": "રીબડા", "survey_number": "૩૬૭", "notice_date": "18/07/2025", "confidence": 0.9}"#,
        );
        let result = extract_fields(&model, "ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭").unwrap();
        assert_eq!(result.village_name.as_deref(), Some("રીબડા"));
        assert_eq!(result.survey_number.as_deref(), Some("૩૬૭"));
        assert!((result.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn village_name_is_postprocessed() {
        // The model returned the whole notice line as the village.
        let model = MockTextModel::new(
            r#"{"village_name": "ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭", "confidence": 0.8}"#,
        );
        let result = extract_fields(&model, "text").unwrap();
        assert_eq!(result.village_name.as_deref(), Some("રીબડા"));
    }

    #[test]
    fn prose_reply_degrades_to_fallback_not_error() {
        let model = MockTextModel::new("Sorry, I cannot help with that.");
        let result = extract_fields(&model, "text").unwrap();
        assert_eq!(result.confidence, PARSE_FAILURE_CONFIDENCE);
        assert!(result.village_name.is_none());
    }

    #[test]
    fn model_errors_propagate() {
        struct FailingModel;
        impl TextModel for FailingModel {
            fn generate(&self, _prompt: &str) -> Result<String, ExtractError> {
                Err(ExtractError::GeminiApi {
                    status: 429,
                    body: "quota exceeded".into(),
                })
            }
            fn model_name(&self) -> &str {
                "failing"
            }
        }

        let err = extract_fields(&FailingModel, "text").unwrap_err();
        assert!(matches!(err, ExtractError::GeminiApi { status: 429, .. }));
    }

    #[test]
    fn prompt_carries_the_notice_text() {
        struct CapturingModel {
            prompts: Mutex<Vec<String>>,
        }
        impl TextModel for CapturingModel {
            fn generate(&self, prompt: &str) -> Result<String, ExtractError> {
                self.prompts.lock().unwrap().push(prompt.to_string());
                Ok("{}".into())
            }
            fn model_name(&self) -> &str {
                "capturing"
            }
        }

        let model = CapturingModel {
            prompts: Mutex::new(Vec::new()),
        };
        extract_fields(&model, "અનોખું લખાણ ૧૨૩").unwrap();
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1, "exactly one model call");
        assert!(prompts[0].contains("અનોખું લખાણ ૧૨૩"));
    }
}
