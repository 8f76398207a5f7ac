//! Shared application state.
//!
//! Built once from [`AppConfig`] before the async runtime starts, because
//! the Google clients are blocking and must not be constructed on a runtime
//! thread. Each credential that is present wires up its client; each absent
//! one leaves a gap that surfaces as a configuration error on first use.

use std::sync::{Arc, OnceLock};

use crate::config::{AppConfig, HTTP_TIMEOUT_SECS};
use crate::pipeline::extract::{GeminiClient, TextModel};
use crate::pipeline::geo::{GeocodeApi, GoogleMapsClient};
use crate::pipeline::ocr::{GoogleVisionClient, VisionOcr};
use crate::pipeline::runner::NoticePipeline;
use crate::store::{FirestoreStore, MemoryStore, NoticeStore, StoreError};

/// `FIRESTORE_PROJECT_ID` value that selects the in-memory store, for
/// running without Google credentials.
pub const MEMORY_STORE_PROJECT: &str = ":memory:";

static PROCESS_STATE: OnceLock<AppState> = OnceLock::new();

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<NoticePipeline>,
    store: Option<Arc<dyn NoticeStore>>,
}

impl AppState {
    /// Build the process-wide state on first call. Repeat calls return the
    /// already-built state and ignore their argument.
    pub fn initialize(config: AppConfig) -> AppState {
        PROCESS_STATE
            .get_or_init(|| AppState::from_config(config))
            .clone()
    }

    pub fn from_config(config: AppConfig) -> Self {
        let vision: Option<Arc<dyn VisionOcr>> = config
            .vision_api_key
            .as_deref()
            .map(|key| Arc::new(GoogleVisionClient::new(key, HTTP_TIMEOUT_SECS)) as _);
        let model: Option<Arc<dyn TextModel>> = config.gemini_api_key.as_deref().map(|key| {
            Arc::new(GeminiClient::new(key, &config.gemini_model, HTTP_TIMEOUT_SECS)) as _
        });
        let geocoder: Option<Arc<dyn GeocodeApi>> = config
            .maps_api_key
            .as_deref()
            .map(|key| Arc::new(GoogleMapsClient::new(key, HTTP_TIMEOUT_SECS)) as _);

        let store = build_store(&config);
        let pipeline = NoticePipeline::new(vision, model, geocoder);

        let availability = pipeline.availability();
        tracing::info!(
            vision = availability.vision,
            gemini = availability.gemini,
            maps = availability.maps,
            store = store.is_some(),
            "application state built"
        );

        AppState {
            config,
            pipeline: Arc::new(pipeline),
            store,
        }
    }

    /// State over explicit collaborators, for tests and embedding.
    pub fn with_parts(
        config: AppConfig,
        pipeline: NoticePipeline,
        store: Option<Arc<dyn NoticeStore>>,
    ) -> Self {
        AppState {
            config,
            pipeline: Arc::new(pipeline),
            store,
        }
    }

    /// The configured store, or a configuration error when none is.
    pub fn store(&self) -> Result<Arc<dyn NoticeStore>, StoreError> {
        self.store.clone().ok_or(StoreError::Configuration)
    }

    pub fn store_configured(&self) -> bool {
        self.store.is_some()
    }
}

fn build_store(config: &AppConfig) -> Option<Arc<dyn NoticeStore>> {
    match (
        config.firestore_project.as_deref(),
        config.firestore_api_key.as_deref(),
    ) {
        (Some(MEMORY_STORE_PROJECT), _) => {
            tracing::warn!("using in-memory store; records are lost on shutdown");
            Some(Arc::new(MemoryStore::new()))
        }
        (Some(project), Some(key)) => {
            Some(Arc::new(FirestoreStore::new(project, key, HTTP_TIMEOUT_SECS)))
        }
        _ => None,
    }
}
