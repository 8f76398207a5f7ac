//! Google Vision REST client for photographed notices.
//!
//! One `images:annotate` call per photograph with both `TEXT_DETECTION` and
//! `DOCUMENT_TEXT_DETECTION` requested; the dense document annotation wins
//! when present because notice boards photograph like documents, not scenes.
//! Gujarati is hinted first so Latin-lookalike glyphs resolve correctly.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::OcrError;

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";

const LANGUAGE_HINTS: &[&str] = &["gu", "en"];

/// OCR output for one image: the detected text plus whatever block-level
/// confidences the service reported.
#[derive(Debug, Clone, Default)]
pub struct VisionAnnotation {
    pub text: String,
    pub block_confidences: Vec<f64>,
}

/// Seam for the OCR service so the pipeline can run against a mock.
pub trait VisionOcr: Send + Sync {
    fn annotate_image(&self, image_bytes: &[u8]) -> Result<VisionAnnotation, OcrError>;
}

/// Production client for the Google Vision REST API.
pub struct GoogleVisionClient {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GoogleVisionClient {
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        Self::with_endpoint(DEFAULT_VISION_ENDPOINT, api_key, timeout_secs)
    }

    pub fn with_endpoint(endpoint: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }
}

// ──────────────────────────────────────────────
// Wire types (images:annotate)
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateEntry<'a>>,
}

#[derive(Serialize)]
struct AnnotateEntry<'a> {
    image: ImageContent,
    features: Vec<Feature<'a>>,
    #[serde(rename = "imageContext")]
    image_context: ImageContext<'a>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    feature_type: &'a str,
}

#[derive(Serialize)]
struct ImageContext<'a> {
    #[serde(rename = "languageHints")]
    language_hints: &'a [&'a str],
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResult>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullTextAnnotation {
    #[serde(default)]
    pages: Vec<AnnotationPage>,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnnotationPage {
    #[serde(default)]
    blocks: Vec<AnnotationBlock>,
}

#[derive(Deserialize)]
struct AnnotationBlock {
    confidence: Option<f64>,
}

/// Per-image error embedded in an otherwise-200 response.
#[derive(Deserialize)]
struct ApiStatus {
    code: i32,
    message: String,
}

impl VisionOcr for GoogleVisionClient {
    fn annotate_image(&self, image_bytes: &[u8]) -> Result<VisionAnnotation, OcrError> {
        let url = format!("{}/v1/images:annotate?key={}", self.endpoint, self.api_key);
        let body = AnnotateRequest {
            requests: vec![AnnotateEntry {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(image_bytes),
                },
                features: vec![
                    Feature { feature_type: "TEXT_DETECTION" },
                    Feature { feature_type: "DOCUMENT_TEXT_DETECTION" },
                ],
                image_context: ImageContext {
                    language_hints: LANGUAGE_HINTS,
                },
            }],
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                OcrError::Connection(self.endpoint.clone())
            } else if e.is_timeout() {
                OcrError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                OcrError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OcrError::VisionApi {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: AnnotateResponse = response
            .json()
            .map_err(|e| OcrError::ResponseParsing(e.to_string()))?;

        let result = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::ResponseParsing("empty responses array".into()))?;

        if let Some(error) = result.error {
            // gRPC status code, not HTTP; 7 is PERMISSION_DENIED.
            return Err(OcrError::VisionApi {
                status: error.code as u16,
                message: error.message,
            });
        }

        let text = result
            .full_text_annotation
            .as_ref()
            .map(|full| full.text.clone())
            .filter(|t| !t.is_empty())
            .or_else(|| {
                result
                    .text_annotations
                    .first()
                    .map(|t| t.description.clone())
            })
            .unwrap_or_default();

        let block_confidences = result
            .full_text_annotation
            .map(|full| {
                full.pages
                    .into_iter()
                    .flat_map(|page| page.blocks)
                    .filter_map(|block| block.confidence)
                    .collect()
            })
            .unwrap_or_default();

        Ok(VisionAnnotation {
            text,
            block_confidences,
        })
    }
}

/// Mock OCR service for testing — returns configured text and confidences.
pub struct MockVisionOcr {
    text: String,
    block_confidences: Vec<f64>,
}

impl MockVisionOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            block_confidences: Vec::new(),
        }
    }

    pub fn with_confidences(mut self, confidences: Vec<f64>) -> Self {
        self.block_confidences = confidences;
        self
    }
}

impl VisionOcr for MockVisionOcr {
    fn annotate_image(&self, _image_bytes: &[u8]) -> Result<VisionAnnotation, OcrError> {
        Ok(VisionAnnotation {
            text: self.text.clone(),
            block_confidences: self.block_confidences.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_annotation() {
        let mock = MockVisionOcr::new("ગામ રીબડા").with_confidences(vec![0.9, 0.8]);
        let annotation = mock.annotate_image(b"fake-jpeg").unwrap();
        assert_eq!(annotation.text, "ગામ રીબડા");
        assert_eq!(annotation.block_confidences, vec![0.9, 0.8]);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = GoogleVisionClient::with_endpoint("http://localhost:9009/", "k", 30);
        assert_eq!(client.endpoint, "http://localhost:9009");
        assert_eq!(client.timeout_secs, 30);
    }

    #[test]
    fn language_hints_put_gujarati_first() {
        assert_eq!(LANGUAGE_HINTS[0], "gu");
        assert!(LANGUAGE_HINTS.contains(&"en"));
    }

    #[test]
    fn annotate_response_parses_blocks_and_text() {
        let raw = r#"{
            "responses": [{
                "textAnnotations": [{"description": "ગામ રીબડા", "locale": "gu"}],
                "fullTextAnnotation": {
                    "pages": [{"blocks": [{"confidence": 0.92}, {"confidence": 0.88}]}],
                    "text": "ગામ રીબડા\nસર્વે નં ૩૬૭"
                }
            }]
        }"#;
        let parsed: AnnotateResponse = serde_json::from_str(raw).unwrap();
        let result = &parsed.responses[0];
        let full = result.full_text_annotation.as_ref().unwrap();
        assert!(full.text.starts_with("ગામ રીબડા"));
        assert_eq!(full.pages[0].blocks.len(), 2);
        assert_eq!(result.text_annotations[0].description, "ગામ રીબડા");
    }

    #[test]
    fn annotate_response_parses_embedded_error() {
        let raw = r#"{
            "responses": [{
                "error": {"code": 7, "message": "Permission denied"}
            }]
        }"#;
        let parsed: AnnotateResponse = serde_json::from_str(raw).unwrap();
        let error = parsed.responses[0].error.as_ref().unwrap();
        assert_eq!(error.code, 7);
        assert_eq!(error.message, "Permission denied");
    }

    #[test]
    fn request_body_serializes_with_camel_case_keys() {
        let body = AnnotateRequest {
            requests: vec![AnnotateEntry {
                image: ImageContent {
                    content: "aGVsbG8=".into(),
                },
                features: vec![Feature {
                    feature_type: "TEXT_DETECTION",
                }],
                image_context: ImageContext {
                    language_hints: LANGUAGE_HINTS,
                },
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        let entry = &json["requests"][0];
        assert_eq!(entry["features"][0]["type"], "TEXT_DETECTION");
        assert_eq!(entry["imageContext"]["languageHints"][0], "gu");
    }
}
