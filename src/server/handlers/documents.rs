use std::path::Path;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::document::{load_document, DocumentKind};
use crate::rag::seed;
use crate::state::AppState;

/// Accepts a guideline file (PDF, text, or markdown) and ingests it.
///
/// The file type is checked before anything touches the pipeline or the
/// index; unsupported uploads are rejected without side effects.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine()?;

    let mut file_name = String::new();
    let mut file_data = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid multipart body: {}", err)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().unwrap_or("unknown").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|err| ApiError::BadRequest(format!("Failed to read upload: {}", err)))?;
            file_data = Some(data);
        }
    }

    let data = file_data
        .ok_or_else(|| ApiError::BadRequest("Missing 'file' field in upload".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is empty", file_name)));
    }

    let kind = DocumentKind::from_file_name(&file_name).ok_or_else(|| {
        ApiError::UnsupportedMediaType(format!(
            "Unsupported file type: {} (only PDF, text, and markdown are accepted)",
            file_name
        ))
    })?;

    // Strip any client-supplied path components before writing to disk.
    let safe_name = Path::new(&file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    let stored_path = state.paths.upload_dir.join(&safe_name);
    tokio::fs::write(&stored_path, &data)
        .await
        .map_err(ApiError::internal)?;
    tracing::info!("Stored upload {} ({} bytes)", safe_name, data.len());

    let document = load_document(&stored_path, kind).await?;
    let chunks_ingested = engine.ingest(&document).await?;

    Ok(Json(json!({
        "message": "Guidelines processed successfully",
        "chunks_ingested": chunks_ingested,
    })))
}

/// Ingests the bundled protocol corpus in one batch.
pub async fn seed_protocols(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine()?;

    let documents = seed::seed_documents();
    let chunks_ingested = engine.ingest_many(&documents).await?;

    Ok(Json(json!({
        "message": "Protocol corpus ingested",
        "documents": documents.len(),
        "chunks_ingested": chunks_ingested,
    })))
}
