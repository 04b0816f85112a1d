//! Configuration module for drivesink.
//!
//! Typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a platform default path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivesink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub retry: RetryConfig,
    pub drive: DriveConfig,
    pub ingest: IngestConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// What to do downstream when a file disappears from the remote tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Keep a local tombstone; leave the downstream document in place.
    #[default]
    Unlink,
    /// Delete the downstream document, then hard-delete the local row
    /// once the sink acknowledged.
    Purge,
}

/// Polling and pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds of idle time between the end of one cycle and the start
    /// of the next.
    pub poll_interval: u64,
    /// Maximum number of items processed concurrently within a cycle.
    pub parallelism: usize,
    /// Downstream handling of remote deletions.
    pub removal_policy: RemovalPolicy,
}

/// Retry/backoff settings, applied uniformly to downloads and submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per item per cycle (first attempt included).
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the exponential backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Base delay as a [`Duration`].
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum delay as a [`Duration`].
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Remote tree provider (Drive-style API) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive-style API.
    pub api_base: String,
    /// Bearer token used for all requests. How this token is obtained is
    /// outside drivesink's scope.
    pub access_token: String,
    /// ID of the remote folder to watch.
    pub root_folder_id: String,
    /// Client-side request budget against the provider.
    pub requests_per_minute: u32,
}

/// Ingestion sink (Dify-style dataset API) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the dataset API.
    pub api_base: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Target dataset (knowledge base) identifier.
    pub dataset_id: String,
}

/// Metadata store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivesink/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivesink")
            .join("config.yaml")
    }

    /// Checks that the fields without sensible defaults are present.
    ///
    /// Returns every missing field at once so the operator can fix the
    /// file in one pass.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut missing = Vec::new();
        if self.drive.access_token.is_empty() {
            missing.push("drive.access_token");
        }
        if self.drive.root_folder_id.is_empty() {
            missing.push("drive.root_folder_id");
        }
        if self.ingest.api_key.is_empty() {
            missing.push("ingest.api_key");
        }
        if self.ingest.dataset_id.is_empty() {
            missing.push("ingest.dataset_id");
        }
        if !missing.is_empty() {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: 300,
            parallelism: 4,
            removal_policy: RemovalPolicy::Unlink,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            access_token: String::new(),
            root_folder_id: String::new(),
            requests_per_minute: 60,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.dify.ai/v1".to_string(),
            api_key: String::new(),
            dataset_id: String::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("drivesink")
                .join("drivesink.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
