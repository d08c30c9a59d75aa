//! Browse, filter and summarize regulatory circulars.
//!
//! Circulars are loaded from a local SQLite table, their free-text dates are
//! normalized, and the set is narrowed by title keyword and date range until
//! a single circular can be selected and sent to a summarization service.

pub mod config;
pub mod dates;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod summarize;
pub mod types;

pub use config::{Config, ConfigBuilder, FileConfig};
pub use dates::{DateNormalizer, DateStrategy, NormalizedDates};
pub use error::{Error, Result};
pub use pipeline::{resolve_id, resolve_label, CircularSet, DateRange, FilterCriteria};
pub use store::{CircularStore, SqliteStore};
pub use summarize::{
    build_prompt, summarize_circular, GeminiSummarizer, Summarizer, SummarizerConfig,
};
pub use types::{Candidate, Circular, RawRecord, RecordTable};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder, FileConfig};
    pub use crate::dates::DateNormalizer;
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{resolve_id, resolve_label, CircularSet, DateRange, FilterCriteria};
    pub use crate::store::{CircularStore, SqliteStore};
    pub use crate::summarize::{summarize_circular, GeminiSummarizer, Summarizer};
    pub use crate::types::{Candidate, Circular};
}
