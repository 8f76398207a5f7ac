//! Recovery-ladder parsing for model replies.
//!
//! Gemini is told to return bare JSON but in practice wraps it in code
//! fences, prefixes it with prose, or occasionally returns prose only. The
//! ladder: strip fences and parse; failing that, parse the first braced
//! block found anywhere in the reply; failing that, give back the all-null
//! fallback result. A reply that arrived never becomes an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::ExtractionResult;

/// First `{...}` block in a reply, dotall so it spans lines. Greedy on
/// purpose: the reply carries one object, and first-brace-to-last-brace
/// survives nested braces inside string values.
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Strip a leading/trailing markdown code fence, tolerating an info string
/// like ```json after the opening fence.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches("json"),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// First braced block in the reply, if any.
pub fn find_json_object(reply: &str) -> Option<&str> {
    JSON_OBJECT_RE.find(reply).map(|m| m.as_str())
}

/// Run the ladder up to "some JSON object parsed": fenced or bare JSON
/// first, then the first braced block.
pub fn json_object_from_reply(reply: &str) -> Option<Value> {
    let stripped = strip_code_fences(reply);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        if value.is_object() {
            return Some(value);
        }
    }
    let block = find_json_object(reply)?;
    serde_json::from_str::<Value>(block)
        .ok()
        .filter(Value::is_object)
}

/// Parse a full-extraction reply. Never fails; the worst reply yields the
/// all-null fallback with its fixed low confidence.
pub fn parse_extraction_reply(reply: &str) -> ExtractionResult {
    let Some(value) = json_object_from_reply(reply) else {
        return ExtractionResult::parse_failure("Model reply contained no parseable JSON object");
    };
    let mut result = extraction_from_value(&value);
    result.clamp_confidence();
    result
}

fn extraction_from_value(value: &Value) -> ExtractionResult {
    ExtractionResult {
        village_name: string_field(value, "village_name"),
        survey_number: string_field(value, "survey_number"),
        buyer_name: string_field(value, "buyer_name"),
        seller_name: string_field(value, "seller_name"),
        notice_date: string_field(value, "notice_date"),
        advocate_name: string_field(value, "advocate_name"),
        advocate_address: string_field(value, "advocate_address"),
        advocate_mobile: string_field(value, "advocate_mobile"),
        district: string_field(value, "district"),
        taluka: string_field(value, "taluka"),
        land_area: string_field(value, "land_area"),
        confidence: number_field(value, "confidence").unwrap_or(0.0),
        notes: string_field(value, "notes"),
    }
}

/// Read a field as a string, tolerating models that emit numbers where a
/// string belongs (survey numbers, mobile numbers) or the literal string
/// "null" instead of JSON null.
pub(crate) fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("n/a") {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a numeric field, tolerating a number quoted as a string.
pub(crate) fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::extraction::PARSE_FAILURE_CONFIDENCE;

    const CLEAN_REPLY: &str = r#"{
        "village_name": "રીબડા",
        "survey_number": "૩૬૭",
        "buyer_name": "પટેલ રમેશભાઈ",
        "seller_name": "શાહ મહેશભાઈ",
        "notice_date": "18/07/2025",
        "advocate_name": "એમ. કે. દવે",
        "advocate_address": "ગોંડલ રોડ, રાજકોટ",
        "advocate_mobile": "9825012345",
        "district": "રાજકોટ",
        "taluka": "ગોંડલ",
        "land_area": "2 હેક્ટર",
        "confidence": 0.87,
        "notes": null
    }"#;

    #[test]
    fn parses_bare_json_reply() {
        let result = parse_extraction_reply(CLEAN_REPLY);
        assert_eq!(result.village_name.as_deref(), Some("રીબડા"));
        assert_eq!(result.survey_number.as_deref(), Some("૩૬૭"));
        assert_eq!(result.notice_date.as_deref(), Some("18/07/2025"));
        assert_eq!(result.advocate_mobile.as_deref(), Some("9825012345"));
        assert_eq!(result.land_area.as_deref(), Some("2 હેક્ટર"));
        assert!((result.confidence - 0.87).abs() < 1e-9);
        assert!(result.notes.is_none());
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = format!("```json\n{CLEAN_REPLY}\n```");
        let result = parse_extraction_reply(&reply);
        assert_eq!(result.village_name.as_deref(), Some("રીબડા"));
    }

    #[test]
    fn recovers_object_embedded_in_prose() {
        let reply = format!("Here is the extraction you asked for:\n\n{CLEAN_REPLY}\n\nLet me know if you need anything else.");
        let result = parse_extraction_reply(&reply);
        assert_eq!(result.district.as_deref(), Some("રાજકોટ"));
        assert!((result.confidence - 0.87).abs() < 1e-9);
    }

    #[test]
    fn unparseable_reply_yields_fixed_low_confidence_fallback() {
        let result = parse_extraction_reply("I could not find any property notice in this text.");
        assert_eq!(result.confidence, PARSE_FAILURE_CONFIDENCE);
        assert!(result.village_name.is_none());
        assert!(result.survey_number.is_none());
        assert!(result.notes.is_some());
    }

    #[test]
    fn confidence_is_clamped() {
        let result = parse_extraction_reply(r#"{"village_name": "રીબડા", "confidence": 7.5}"#);
        assert_eq!(result.confidence, 1.0);

        let result = parse_extraction_reply(r#"{"village_name": "રીબડા", "confidence": -2}"#);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn string_null_and_blank_become_none() {
        let result =
            parse_extraction_reply(r#"{"village_name": "null", "district": "  ", "taluka": "N/A"}"#);
        assert!(result.village_name.is_none());
        assert!(result.district.is_none());
        assert!(result.taluka.is_none());
    }

    #[test]
    fn numeric_survey_number_is_stringified() {
        let result = parse_extraction_reply(r#"{"survey_number": 367, "confidence": "0.6"}"#);
        assert_eq!(result.survey_number.as_deref(), Some("367"));
        assert!((result.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn strip_code_fences_variants() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn find_json_object_spans_lines() {
        let reply = "noise before\n{\n \"a\": 1\n}\nnoise after";
        assert_eq!(find_json_object(reply), Some("{\n \"a\": 1\n}"));
        assert_eq!(find_json_object("no braces at all"), None);
    }

    #[test]
    fn non_object_json_falls_through_to_fallback() {
        let result = parse_extraction_reply("[1, 2, 3]");
        assert_eq!(result.confidence, PARSE_FAILURE_CONFIDENCE);
    }
}
