//! Guideline document loading and chunking.

mod chunker;
mod loader;

pub use chunker::{DocumentChunk, TextChunker};
pub use loader::{load_document, Document, DocumentKind, Page};
