use crate::dates::{DateNormalizer, DEFAULT_DATE_FORMATS};
use crate::error::{Error, Result};
use crate::store::DEFAULT_TABLE;
use crate::summarize::{SummarizerConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database used when neither flag, env var nor config file names one
pub const DEFAULT_DATABASE: &str = "sebi_circulars.db";

/// Optional YAML settings file (circulars.yml)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database: Option<PathBuf>,
    pub table: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub date_formats: Option<Vec<String>>,
}

impl FileConfig {
    /// Load and parse a YAML settings file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Configuration for one run of the dashboard
#[derive(Debug, Clone)]
pub struct Config {
    pub database: PathBuf,
    pub table: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Option<Duration>,
    pub date_formats: Vec<String>,
    pub api_key: Option<String>,
}

impl Config {
    /// Create a new default configuration
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            table: DEFAULT_TABLE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            api_key: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.database.exists() {
            return Err(Error::Config(format!(
                "Database file does not exist: {}",
                self.database.display()
            )));
        }

        if !self.database.is_file() {
            return Err(Error::Config(format!(
                "Database path is not a file: {}",
                self.database.display()
            )));
        }

        if self.date_formats.is_empty() {
            return Err(Error::Config("At least one date format is required".to_string()));
        }

        Ok(())
    }

    /// Date normalizer using the configured format list
    pub fn normalizer(&self) -> Result<DateNormalizer> {
        DateNormalizer::with_formats(self.date_formats.clone())
    }

    /// Summarizer settings; fails when no API key was supplied
    pub fn summarizer(&self) -> Result<SummarizerConfig> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            Error::Config(
                "No API key for the summarization service (set GEMINI_API_KEY or --api-key)"
                    .to_string(),
            )
        })?;
        Ok(SummarizerConfig::new(api_key)
            .model(self.model.clone())
            .endpoint(self.endpoint.clone())
            .timeout(self.timeout))
    }
}

/// Builder for creating configurations
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default settings
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            config: Config::new(database),
        }
    }

    /// Set the database file
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database = path.into();
        self
    }

    /// Set the table to read circulars from
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.config.table = table.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout = Some(Duration::from_secs(secs));
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Replace the ordered date format list
    pub fn date_formats(mut self, formats: Vec<String>) -> Self {
        self.config.date_formats = formats;
        self
    }

    /// Apply settings from a YAML file; fields absent from the file are left alone
    pub fn file_config(mut self, file: FileConfig) -> Self {
        if let Some(database) = file.database {
            self.config.database = database;
        }
        if let Some(table) = file.table {
            self.config.table = table;
        }
        if let Some(model) = file.model {
            self.config.model = model;
        }
        if let Some(endpoint) = file.endpoint {
            self.config.endpoint = endpoint;
        }
        if let Some(secs) = file.timeout_secs {
            self.config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(formats) = file.date_formats {
            self.config.date_formats = formats;
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_config_overrides_defaults() {
        let file: FileConfig = serde_yaml::from_str(
            "table: drafts\nmodel: gemini-1.5-pro\ntimeout_secs: 90\ndate_formats:\n  - \"%Y-%m-%d\"\n",
        )
        .unwrap();
        let config = ConfigBuilder::new("db.sqlite").file_config(file).config;
        assert_eq!(config.table, "drafts");
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.date_formats, vec!["%Y-%m-%d".to_string()]);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_unknown_yaml_key_is_rejected() {
        assert!(serde_yaml::from_str::<FileConfig>("databse: x.db\n").is_err());
    }

    #[test]
    fn test_missing_database_fails_validation() {
        let err = ConfigBuilder::new("does/not/exist.db").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_summarizer_requires_api_key() {
        let config = Config::default();
        assert!(config.summarizer().is_err());

        let config = ConfigBuilder::new("db.sqlite").api_key("k").model("m").config;
        let summarizer = config.summarizer().unwrap();
        assert_eq!(summarizer.model, "m");
        assert_eq!(summarizer.timeout, None);
    }
}
