//! Dashboard API router.
//!
//! Returns a composable `Router` with every endpoint nested under
//! `/api/`. CORS is open so the static dashboard can be served from
//! anywhere; request tracing comes from `tower-http`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints::{geocoding, notices, process, refinement, system};
use crate::config::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Build the dashboard API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn notice_api_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/process-notice", post(process::process_notice))
        .route("/extract-raw-text", post(process::extract_raw_text))
        .route("/process-with-gemini", post(process::process_with_gemini))
        .route(
            "/process-text-with-gemini",
            post(process::process_text_with_gemini),
        )
        .route("/save-notice", post(process::save_notice))
        .route("/notices", get(notices::list))
        .route("/notices/export", get(notices::export_csv))
        .route(
            "/notices/:id",
            get(notices::detail).delete(notices::remove),
        )
        .route("/notices/:id/logs", get(notices::logs))
        .route("/geocode/village", post(geocoding::village))
        .route("/geocode/batch", post(geocoding::batch))
        .route("/geocode/existing", post(geocoding::existing))
        .route("/refine-notice/:id", post(refinement::refine_notice))
        .route("/refine-batch", post(refinement::refine_batch))
        .route("/health", get(system::health))
        .route("/status", get(system::status))
        .route("/test-gemini", get(system::test_gemini))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        // Body cap sits above the image cap; the upload handler enforces
        // MAX_UPLOAD_BYTES itself and answers with its own 413 body.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
