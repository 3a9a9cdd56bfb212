pub mod chart_export;
pub mod cli;
pub mod config;
pub mod contingency;
pub mod error;
pub mod normalize;
pub mod parse;
pub mod popularity;
pub mod record;
pub mod report;
pub mod search;
pub mod store;
pub mod tfidf;
pub mod trends;

pub use cli::Args;
pub use config::{AnalysisConfig, AppConfig};
pub use error::{Error, Result};
pub use record::AnimeRecord;
pub use store::DatasetStore;

/// Application name used for the config directory and other app-specific
/// paths.
pub const APP_NAME: &str = "anilens";
