//! Configuration types for reader-pipeline

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

const MIB: u64 = 1024 * 1024;

/// Main configuration
///
/// Every field has a default, so `Config::default()` or an empty JSON object is a working setup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote acquisition behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Per-chunk retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pagination budgets
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Reading-position persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the pipeline degenerate
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, bool); 7] = [
            ("download.chunk_size", self.download.chunk_size > 0),
            ("download.text_fetch_limit", self.download.text_fetch_limit > 0),
            ("download.workers", self.download.workers > 0),
            ("retry.max_attempts", self.retry.max_attempts > 0),
            ("layout.single_page_budget", self.layout.single_page_budget > 0),
            ("layout.double_page_budget", self.layout.double_page_budget > 0),
            (
                "persistence.auto_save_interval",
                !self.persistence.auto_save_interval.is_zero(),
            ),
        ];

        match checks.iter().find(|(_, ok)| !ok) {
            Some((key, _)) => Err(Error::Config {
                message: format!("{key} must be greater than zero"),
                key: Some((*key).to_string()),
            }),
            None => Ok(()),
        }
    }
}

/// Download behavior configuration (chunking, concurrency, dispatch by file name)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Size of each chunk request on the chunked path (default: 10 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Resources below this size are fetched with one request (default: 26 MiB)
    #[serde(default = "default_single_request_threshold")]
    pub single_request_threshold: u64,

    /// Upper bound of the single fetch used for plain-text resources (default: 10 MiB)
    #[serde(default = "default_text_fetch_limit")]
    pub text_fetch_limit: u64,

    /// Number of concurrent chunk workers (default: 3)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// File extensions fetched and decoded as plain text (default: ["txt"])
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,

    /// File extensions handed to an external viewer without downloading (default: ["pdf"])
    #[serde(default = "default_external_extensions")]
    pub external_extensions: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            single_request_threshold: default_single_request_threshold(),
            text_fetch_limit: default_text_fetch_limit(),
            workers: default_workers(),
            text_extensions: default_text_extensions(),
            external_extensions: default_external_extensions(),
        }
    }
}

/// Retry configuration for transient chunk failures
///
/// `max_attempts` counts every request, including the first one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per chunk (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1000 ms)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 1000 ms)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, a fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Same attempt budget with no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Text pagination budgets, counted in plain-text characters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Characters per page in single-page mode (default: 1500)
    #[serde(default = "default_single_page_budget")]
    pub single_page_budget: usize,

    /// Characters per half-page in double-page mode (default: 1000)
    #[serde(default = "default_double_page_budget")]
    pub double_page_budget: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            single_page_budget: default_single_page_budget(),
            double_page_budget: default_double_page_budget(),
        }
    }
}

/// Reading-position persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Interval of the auto-save timer while a book is open (default: 10000 ms)
    #[serde(default = "default_auto_save_interval", with = "duration_ms_serde")]
    pub auto_save_interval: Duration,

    /// SQLite file backing the key-value store (None = in-memory store)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            auto_save_interval: default_auto_save_interval(),
            database_path: None,
        }
    }
}

fn default_chunk_size() -> u64 {
    10 * MIB
}

fn default_single_request_threshold() -> u64 {
    26 * MIB
}

fn default_text_fetch_limit() -> u64 {
    10 * MIB
}

fn default_workers() -> usize {
    3
}

fn default_text_extensions() -> Vec<String> {
    vec!["txt".into()]
}

fn default_external_extensions() -> Vec<String> {
    vec!["pdf".into()]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_single_page_budget() -> usize {
    1500
}

fn default_double_page_budget() -> usize {
    1000
}

fn default_auto_save_interval() -> Duration {
    Duration::from_millis(10_000)
}

// Duration serialization helper (integer milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
