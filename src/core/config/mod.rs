pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{IngestPolicy, LlmSettings, RagSettings, Settings};
