use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{documents, health, query};
use crate::state::AppState;

/// Builds the application router.
///
/// Routes:
/// - `GET /health`: readiness, including the degraded no-credential state
/// - `POST /upload`: multipart guideline upload and ingestion
/// - `POST /seed`: ingest the bundled protocol corpus
/// - `POST /query`: question answering over ingested guidelines
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/upload", post(documents::upload_document))
        .route("/seed", post(documents::seed_protocols))
        .route("/query", post(query::query_guidelines))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}
