//! API endpoint handlers, grouped by feature.
//!
//! Handlers are thin: decode the request, bridge to the blocking
//! pipeline with `run_blocking`, encode the outcome.

pub mod geocoding;
pub mod notices;
pub mod process;
pub mod refinement;
pub mod system;

use crate::api::error::ApiError;

/// Run a blocking pipeline or store call off the async worker threads.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {e}")))?
}
