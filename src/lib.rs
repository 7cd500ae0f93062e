//! Retrieval-augmented question answering for clinical guideline documents.
//!
//! Uploaded guidelines are chunked, embedded, and stored in a SQLite-backed
//! vector index; questions are answered by an LLM from the retrieved context
//! with inline page citations and a faithfulness-based confidence score.

pub mod core;
pub mod document;
pub mod index;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
