use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::{AppState, Readiness};

/// Always answers, even when the service is degraded, so load balancers can
/// tell cold start and missing credentials apart from a dead process.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.readiness();
    let chunks_indexed = state.index.count().await.unwrap_or(0);

    let status = match readiness {
        Readiness::Degraded => "degraded",
        _ => "ok",
    };

    Json(json!({
        "status": status,
        "state": readiness.as_str(),
        "chunks_indexed": chunks_indexed,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
