use serde::{Deserialize, Serialize};

/// Confidence reported when the model's reply could not be parsed at all.
pub const PARSE_FAILURE_CONFIDENCE: f64 = 0.1;

/// Structured fields pulled out of one notice by the language model.
///
/// `notice_date` stays a raw string here; it becomes a calendar date when
/// a record is built, so every date format the model emits goes through
/// one parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub village_name: Option<String>,
    pub survey_number: Option<String>,
    pub buyer_name: Option<String>,
    pub seller_name: Option<String>,
    pub notice_date: Option<String>,
    pub advocate_name: Option<String>,
    pub advocate_address: Option<String>,
    pub advocate_mobile: Option<String>,
    pub district: Option<String>,
    pub taluka: Option<String>,
    pub land_area: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    pub notes: Option<String>,
}

impl ExtractionResult {
    /// All-null result used when the model replied but nothing parseable
    /// came back. Deliberately not an error: the caller still gets a row it
    /// can store and a human can fix.
    pub fn parse_failure(note: impl Into<String>) -> Self {
        ExtractionResult {
            confidence: PARSE_FAILURE_CONFIDENCE,
            notes: Some(note.into()),
            ..ExtractionResult::default()
        }
    }

    /// Keep reported confidence inside [0, 1] whatever the model claimed.
    pub fn clamp_confidence(&mut self) {
        if !self.confidence.is_finite() {
            self.confidence = 0.0;
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_is_all_null_with_fixed_confidence() {
        let result = ExtractionResult::parse_failure("model returned prose");
        assert_eq!(result.confidence, PARSE_FAILURE_CONFIDENCE);
        assert!(result.village_name.is_none());
        assert!(result.survey_number.is_none());
        assert!(result.notice_date.is_none());
        assert_eq!(result.notes.as_deref(), Some("model returned prose"));
    }

    #[test]
    fn clamp_confidence_bounds_and_sanitizes() {
        let mut result = ExtractionResult {
            confidence: 3.2,
            ..ExtractionResult::default()
        };
        result.clamp_confidence();
        assert_eq!(result.confidence, 1.0);

        result.confidence = -0.4;
        result.clamp_confidence();
        assert_eq!(result.confidence, 0.0);

        result.confidence = f64::NAN;
        result.clamp_confidence();
        assert_eq!(result.confidence, 0.0);
    }
}
