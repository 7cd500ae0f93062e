//! Vector index over guideline chunks.
//!
//! The index is an explicitly owned object handed to request handlers via
//! `AppState`, never process-global. The primary implementation is
//! `SqliteVectorIndex`.

mod sqlite;
mod store;

pub use sqlite::SqliteVectorIndex;
pub use store::{ScoredChunk, VectorIndex};
