//! Service configuration.
//!
//! Everything runtime-tunable comes from environment variables; a `.env`
//! file is honored in development. Credentials are optional at startup: a
//! service whose key is absent stays unconfigured, and the first request
//! that needs it gets a configuration error instead of a crash.

use std::env;

/// Application-level constants
pub const APP_NAME: &str = "Khatpatra";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upload cap for notice photographs, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Fixed pause between entries of a geocoding sweep.
pub const GEOCODE_BATCH_DELAY_MS: u64 = 250;

/// Fixed pause between entries of a refinement sweep.
pub const REFINE_BATCH_DELAY_MS: u64 = 500;

/// Page size when listing notices without an explicit limit.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Outbound timeout shared by every Google API client.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// Page size for the CSV export endpoint.
pub const EXPORT_LIST_LIMIT: usize = 1000;

/// Gemini model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub vision_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub maps_api_key: Option<String>,
    pub firestore_project: Option<String>,
    pub firestore_api_key: Option<String>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset so a
    /// blank line in a `.env` file does not masquerade as a credential.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        AppConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            vision_api_key: get("VISION_API_KEY"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            maps_api_key: get("MAPS_API_KEY"),
            firestore_project: get("FIRESTORE_PROJECT_ID"),
            firestore_api_key: get("FIRESTORE_API_KEY"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
