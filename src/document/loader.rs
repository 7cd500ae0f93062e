use std::path::Path;

use crate::core::errors::ApiError;

/// Supported guideline document formats.
///
/// Closed set: anything else is rejected at the upload boundary before the
/// pipeline does any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();

        match extension.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "text" => Some(DocumentKind::Text),
            "md" | "markdown" => Some(DocumentKind::Markdown),
            _ => None,
        }
    }
}

/// One page of extracted text. `number` is 1-based.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: usize,
    pub text: String,
}

/// A loaded source document as an ordered sequence of pages.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// Builds a single-page document, used for plain text sources.
    pub fn single_page(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            pages: vec![Page {
                number: 1,
                text: text.into(),
            }],
        }
    }
}

/// Loads a document from disk according to its kind.
///
/// PDF extraction runs on the blocking pool; an extraction that yields no
/// text at all (image-only or encrypted PDF) is an error rather than a
/// silently empty ingestion.
pub async fn load_document(path: &Path, kind: DocumentKind) -> Result<Document, ApiError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unknown")
        .to_string();

    match kind {
        DocumentKind::Pdf => load_pdf(path, file_name).await,
        DocumentKind::Text | DocumentKind::Markdown => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|err| ApiError::Internal(format!("Failed to read {}: {}", file_name, err)))?;
            Ok(Document::single_page(file_name, text))
        }
    }
}

async fn load_pdf(path: &Path, file_name: String) -> Result<Document, ApiError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| ApiError::Internal(format!("Failed to read {}: {}", file_name, err)))?;

    let page_texts = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("PDF extraction task failed: {}", err)))?
    .map_err(|err| {
        ApiError::BadRequest(format!("Could not extract text from {}: {}", file_name, err))
    })?;

    if page_texts.iter().all(|text| text.trim().is_empty()) {
        return Err(ApiError::BadRequest(format!(
            "{} contains no extractable text (image-based or encrypted PDF)",
            file_name
        )));
    }

    let pages = page_texts
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Page {
            number: idx + 1,
            text,
        })
        .collect();

    Ok(Document { file_name, pages })
}
