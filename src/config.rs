//! Configuration types for isbn-enrich

use crate::batcher::MAX_RESULTS_PER_QUERY;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Remote lookup API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Volume search endpoint (default: Google Books `volumes`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as the `key` query parameter (never logged)
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Batch sizing and concurrency ceiling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Identifiers per request (default: 40, at most 40)
    ///
    /// Identifiers past the last full batch are not fetched.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum simultaneous in-flight requests (default: 8)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Where checkpoints and the merged output live
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `_partNNNN.csv` artifact per batch (default: "data/tmp")
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,

    /// Merged output file (default: "data/processed/book_processed_data.csv")
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            output_path: default_output_path(),
        }
    }
}

/// Identifier source dataset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// CSV dataset to read identifiers from (default: "data/raw/goodreads.csv")
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Column holding the identifiers (default: "isbn13")
    #[serde(default = "default_isbn_column")]
    pub isbn_column: String,

    /// Column holding the language code (default: "language_code")
    #[serde(default = "default_language_column")]
    pub language_column: String,

    /// Rows are kept when their language code starts with this prefix (default: "en")
    #[serde(default = "default_language_prefix")]
    pub language_prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            isbn_column: default_isbn_column(),
            language_column: default_language_column(),
            language_prefix: default_language_prefix(),
        }
    }
}

/// Main configuration for the enrichment pipeline
///
/// Passed by reference into each component's constructor; nothing in the
/// crate reads configuration from global state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Batch sizing and concurrency
    #[serde(default)]
    pub batching: BatchingConfig,

    /// Checkpoint and output locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Identifier source dataset
    #[serde(default)]
    pub source: SourceConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The result is validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("cannot parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value the pipeline depends on
    pub fn validate(&self) -> Result<()> {
        if self.batching.batch_size == 0 {
            return Err(Error::config(
                "batching.batch_size",
                "batch_size must be at least 1",
            ));
        }
        if self.batching.batch_size > MAX_RESULTS_PER_QUERY {
            return Err(Error::config(
                "batching.batch_size",
                format!("batch_size must not exceed {MAX_RESULTS_PER_QUERY}, one result page"),
            ));
        }
        if self.batching.max_concurrency == 0 {
            return Err(Error::config(
                "batching.max_concurrency",
                "max_concurrency must be at least 1",
            ));
        }
        if self.api.request_timeout.is_zero() {
            return Err(Error::config(
                "api.request_timeout",
                "request_timeout must be greater than zero",
            ));
        }
        self.api.endpoint()?;
        Ok(())
    }
}

impl ApiConfig {
    /// Parse `base_url`, accepting only http(s) endpoints
    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            Error::config("api.base_url", format!("invalid URL {:?}: {}", self.base_url, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::config(
                "api.base_url",
                format!("unsupported scheme {other:?}"),
            )),
        }
    }
}

fn default_base_url() -> String {
    "https://www.googleapis.com/books/v1/volumes".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_batch_size() -> usize {
    40
}

fn default_max_concurrency() -> usize {
    8
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("data/tmp")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/processed/book_processed_data.csv")
}

fn default_input_path() -> PathBuf {
    PathBuf::from("data/raw/goodreads.csv")
}

fn default_isbn_column() -> String {
    "isbn13".to_string()
}

fn default_language_column() -> String {
    "language_code".to_string()
}

fn default_language_prefix() -> String {
    "en".to_string()
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
