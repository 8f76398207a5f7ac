//! Prompt templates for the extraction and refinement passes.
//!
//! The notice format is fixed, so the instruction wrapper is too: one JSON
//! shape, nulls for anything not visible, dates in DD/MM/YYYY as printed on
//! the notices themselves.

use crate::models::ExtractionResult;

/// Build the full-extraction prompt for one notice's OCR text.
pub fn build_extraction_prompt(raw_text: &str) -> String {
    format!(
        r#"You are reading the OCR text of a Gujarati property-transfer public notice
(જાહેર નોટિસ) published by an advocate. Extract the fields below.

Return ONLY a JSON object, no prose and no markdown, in exactly this shape:

{{
  "village_name": "village (ગામ) name only, no prefixes or survey numbers, or null",
  "survey_number": "revenue survey number (રેવન્યુ સર્વે નં) or null",
  "buyer_name": "name of the buying party or null",
  "seller_name": "name of the selling party or null",
  "notice_date": "date of the notice as DD/MM/YYYY or null",
  "advocate_name": "advocate's name or null",
  "advocate_address": "advocate's office address or null",
  "advocate_mobile": "advocate's mobile number, digits only, or null",
  "district": "district (જિલ્લો) or null",
  "taluka": "taluka (તાલુકો) or null",
  "land_area": "land area as printed, with its unit, or null",
  "confidence": 0.0,
  "notes": "anything unusual about this notice, or null"
}}

Rules:
- Extract only what is explicitly printed. Never guess; use null when unsure.
- Keep Gujarati values in Gujarati script exactly as printed.
- "village_name" must be the bare name: strip "ગામ", "મોજે" and case endings.
- "confidence" is your overall confidence in this extraction, 0.0 to 1.0.

Notice text:
{raw_text}
"#
    )
}

/// Build the narrower refinement prompt: re-read the notice and correct only
/// the location-critical fields, with optional coordinates when the model
/// actually knows the village.
pub fn build_refinement_prompt(raw_text: &str, current: &ExtractionResult) -> String {
    let village = current.village_name.as_deref().unwrap_or("null");
    let survey = current.survey_number.as_deref().unwrap_or("null");
    let date = current.notice_date.as_deref().unwrap_or("null");

    format!(
        r#"A first extraction pass over a Gujarati property-notice produced these values:

  village_name: {village}
  survey_number: {survey}
  notice_date: {date}

Re-read the notice text below and correct them where the first pass misread.
If you recognize the village and are confident of its location in Gujarat,
include its coordinates; otherwise leave latitude and longitude null.

Return ONLY a JSON object in exactly this shape:

{{
  "village_name": "corrected village name or null",
  "survey_number": "corrected survey number or null",
  "notice_date": "corrected date as DD/MM/YYYY or null",
  "latitude": null,
  "longitude": null,
  "confidence": 0.0
}}

Notice text:
{raw_text}
"#
    )
}

/// One-line probe prompt for the connectivity check endpoint.
pub const TEST_PROMPT: &str =
    "Reply with the single word OK if you can read this.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_embeds_notice_text() {
        let prompt = build_extraction_prompt("ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭");
        assert!(prompt.contains("ગામ રીબડાના રેવન્યુ સર્વે નં ૩૬૭"));
        assert!(prompt.contains("\"village_name\""));
        assert!(prompt.contains("\"land_area\""));
        assert!(prompt.contains("DD/MM/YYYY"));
        assert!(prompt.contains("ONLY a JSON object"));
    }

    #[test]
    fn extraction_prompt_names_all_eleven_fields() {
        let prompt = build_extraction_prompt("text");
        for field in [
            "village_name",
            "survey_number",
            "buyer_name",
            "seller_name",
            "notice_date",
            "advocate_name",
            "advocate_address",
            "advocate_mobile",
            "district",
            "taluka",
            "land_area",
        ] {
            assert!(prompt.contains(field), "missing field {field}");
        }
    }

    #[test]
    fn refinement_prompt_embeds_current_values() {
        let current = ExtractionResult {
            village_name: Some("રીબડા".into()),
            survey_number: Some("૩૬૭".into()),
            notice_date: Some("18/07/2025".into()),
            ..ExtractionResult::default()
        };
        let prompt = build_refinement_prompt("notice body", &current);
        assert!(prompt.contains("village_name: રીબડા"));
        assert!(prompt.contains("survey_number: ૩૬૭"));
        assert!(prompt.contains("notice_date: 18/07/2025"));
        assert!(prompt.contains("notice body"));
        assert!(prompt.contains("latitude"));
    }

    #[test]
    fn refinement_prompt_shows_null_for_missing_values() {
        let prompt = build_refinement_prompt("text", &ExtractionResult::default());
        assert!(prompt.contains("village_name: null"));
        assert!(prompt.contains("notice_date: null"));
    }
}
