//! Gemini REST client for the extraction and refinement prompts.

use serde::{Deserialize, Serialize};

use super::ExtractError;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Seam for the generative model so extraction logic can run against a mock.
pub trait TextModel: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, ExtractError>;

    fn model_name(&self) -> &str;
}

/// Production client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Self {
        Self::with_endpoint(DEFAULT_GEMINI_ENDPOINT, api_key, model, timeout_secs)
    }

    pub fn with_endpoint(endpoint: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        }
    }
}

// ──────────────────────────────────────────────
// Wire types (models/{model}:generateContent)
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl TextModel for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, ExtractError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ExtractError::Connection(self.endpoint.clone())
            } else if e.is_timeout() {
                ExtractError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ExtractError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractError::GeminiApi {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractError::ResponseParsing(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ExtractError::EmptyCompletion);
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock model for testing — returns a configured reply verbatim.
pub struct MockTextModel {
    reply: String,
}

impl MockTextModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

impl TextModel for MockTextModel {
    fn generate(&self, _prompt: &str) -> Result<String, ExtractError> {
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_reply() {
        let model = MockTextModel::new("{\"village_name\": \"રીબડા\"}");
        let reply = model.generate("anything").unwrap();
        assert!(reply.contains("રીબડા"));
        assert_eq!(model.model_name(), "mock-model");
    }

    #[test]
    fn client_constructor_trims_and_stores_model() {
        let client = GeminiClient::with_endpoint("http://localhost:9010/", "k", "gemini-1.5-flash", 60);
        assert_eq!(client.endpoint, "http://localhost:9010");
        assert_eq!(client.model_name(), "gemini-1.5-flash");
        assert_eq!(client.timeout_secs, 60);
    }

    #[test]
    fn response_parses_candidate_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "{\"village"}, {"text": "_name\": null}"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let joined: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .map(|p| p.text.clone())
            .collect();
        assert_eq!(joined, "{\"village_name\": null}");
    }

    #[test]
    fn empty_candidates_parse_to_empty_vec() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
