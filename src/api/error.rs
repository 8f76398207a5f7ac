//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::MAX_UPLOAD_BYTES;
use crate::pipeline::extract::ExtractError;
use crate::pipeline::geo::GeocodeError;
use crate::pipeline::ocr::OcrError;
use crate::pipeline::runner::PipelineError;
use crate::store::StoreError;

/// Structured error response body for the dashboard.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("No text supplied")]
    EmptyText,
    #[error("No text detected in image")]
    NoTextDetected,
    #[error("Uploaded image is too large")]
    PayloadTooLarge,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Upstream service denied the request: {0}")]
    UpstreamDenied(String),
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::EmptyText => (
                StatusCode::BAD_REQUEST,
                "EMPTY_TEXT",
                "No text supplied".to_string(),
            ),
            ApiError::NoTextDetected => (
                StatusCode::BAD_REQUEST,
                "NO_TEXT_DETECTED",
                "No text detected in image".to_string(),
            ),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("Uploaded image exceeds {MAX_UPLOAD_BYTES} bytes"),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::NotConfigured(service) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NOT_CONFIGURED",
                format!("{service} is not configured"),
            ),
            ApiError::UpstreamDenied(detail) => {
                (StatusCode::FORBIDDEN, "UPSTREAM_DENIED", detail)
            }
            ApiError::Upstream(detail) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR", detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<OcrError> for ApiError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::NoTextDetected => ApiError::NoTextDetected,
            OcrError::EmptyText => ApiError::EmptyText,
            OcrError::FileNotFound(path) => {
                ApiError::BadRequest(format!("Image file not found: {path}"))
            }
            OcrError::Configuration => ApiError::NotConfigured("Google Vision"),
            OcrError::VisionApi { status: 403, message } => ApiError::UpstreamDenied(message),
            OcrError::Io(e) => ApiError::Internal(e.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Configuration => ApiError::NotConfigured("Gemini"),
            ExtractError::GeminiApi { status: 403, body } => ApiError::UpstreamDenied(body),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<GeocodeError> for ApiError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::Configuration => ApiError::NotConfigured("Google Maps"),
            GeocodeError::Api { status, message } if status == "REQUEST_DENIED" => {
                ApiError::UpstreamDenied(message)
            }
            GeocodeError::Http { status: 403, body } => ApiError::UpstreamDenied(body),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Configuration => ApiError::NotConfigured("Firestore"),
            StoreError::NotFound(id) => ApiError::NotFound(format!("Notice {id} not found")),
            StoreError::Firestore { status: 403, body } => ApiError::UpstreamDenied(body),
            StoreError::InvalidField { field, value } => {
                ApiError::Internal(format!("Invalid value for {field}: {value}"))
            }
            StoreError::LockPoisoned => ApiError::Internal("store lock poisoned".into()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyInput => ApiError::EmptyText,
            PipelineError::Ocr(e) => e.into(),
            PipelineError::Extract(e) => e.into(),
            PipelineError::Geocode(e) => e.into(),
            PipelineError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn no_text_detected_returns_400() {
        let response = ApiError::from(OcrError::NoTextDetected).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NO_TEXT_DETECTED");
    }

    #[tokio::test]
    async fn missing_credentials_return_not_configured() {
        let response = ApiError::from(ExtractError::Configuration).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_CONFIGURED");
        assert_eq!(json["error"]["message"], "Gemini is not configured");
    }

    #[tokio::test]
    async fn denied_geocoding_returns_403() {
        let err = GeocodeError::Api {
            status: "REQUEST_DENIED".into(),
            message: "The provided API key is invalid.".into(),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "UPSTREAM_DENIED");
    }

    #[tokio::test]
    async fn over_quota_geocoding_is_an_upstream_error() {
        let err = GeocodeError::Api {
            status: "OVER_QUERY_LIMIT".into(),
            message: "quota exceeded".into(),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn missing_notice_returns_404_with_its_id() {
        let id = Uuid::new_v4();
        let response = ApiError::from(StoreError::NotFound(id)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        let message = json["error"]["message"].as_str().unwrap();
        assert!(message.contains(&id.to_string()));
    }

    #[tokio::test]
    async fn payload_too_large_returns_413() {
        let response = ApiError::PayloadTooLarge.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::Internal("connection string leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn empty_pipeline_input_maps_to_empty_text() {
        let response = ApiError::from(PipelineError::EmptyInput).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "EMPTY_TEXT");
    }
}
