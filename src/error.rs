use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The store returned zero records
    #[error("No data available.")]
    DataAbsent,

    /// Required columns are missing from the store's table
    #[error("The {} column is missing from the data.", .missing.join(", "))]
    SchemaInvalid { missing: Vec<String> },

    /// Every date in the table failed to parse
    #[error("Could not parse any valid dates. Check the 'Date' column format in the database.\n{preview}")]
    DateNormalization { preview: String },

    /// Filters were applied but nothing matched
    #[error("No circulars found for the selected filters.")]
    NoMatches,

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Circular not found: {0}")]
    NotFound(String),

    #[error("The selected circular has no extracted text.")]
    MissingText,

    /// The summarization service failed
    #[error("Summarization failed: {0}")]
    Summarization(String),
}

impl Error {
    /// Conditions the user resolves by changing inputs, shown as warnings
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::DataAbsent | Error::NoMatches)
    }
}
