//! Configuration types for vodcast-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the orchestrator does when one item of a batch fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next item
    #[default]
    Continue,
    /// Stop the batch and return the first error
    Abort,
}

/// Main configuration for a feed run
///
/// Every field has a default so a file only needs to name what it changes.
/// Command line flags are applied on top of whatever a file provides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Feed location: http(s) URL, file:// URL or a local path
    #[serde(default)]
    pub feed_url: String,

    /// Directory enclosures are written to (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Directory holding the per-feed "last fetched" file (None = download_dir)
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Days to look back when no reference date has been recorded yet (default: 7)
    #[serde(default = "default_day_offset")]
    pub day_offset: u32,

    /// Download threads (default: 1)
    ///
    /// Accepted for compatibility; items are always fetched one after another.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Read buffer size for streaming enclosures (default: 100 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Interval between progress reports (default: 1 second)
    #[serde(default = "default_report_interval", with = "duration_serde")]
    pub report_interval: Duration,

    /// Connect timeout for HTTP requests (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Offset from UTC, in minutes, used to interpret naive timestamps
    ///
    /// None = the host offset, captured once at startup.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,

    /// Behaviour when an item fails (default: continue)
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Refuse to start a transfer whose declared size exceeds free space (default: true)
    #[serde(default = "default_true")]
    pub check_disk_space: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: String::new(),
            download_dir: default_download_dir(),
            state_dir: None,
            day_offset: default_day_offset(),
            threads: default_threads(),
            chunk_size: default_chunk_size(),
            report_interval: default_report_interval(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            utc_offset_minutes: None,
            failure_policy: FailurePolicy::default(),
            check_disk_space: true,
        }
    }
}

impl Config {
    /// Load a configuration file
    ///
    /// Files ending in `.json` are read as JSON, everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// Directory holding the per-feed state file
    pub fn state_dir(&self) -> &Path {
        self.state_dir.as_deref().unwrap_or(self.download_dir.as_path())
    }

    /// Check the settings a run cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.feed_url.trim().is_empty() {
            return Err(config_error("feed url is required", "feed_url"));
        }
        if !self.download_dir.is_dir() {
            return Err(config_error(
                format!(
                    "download directory {} does not exist or is not a directory",
                    self.download_dir.display()
                ),
                "download_dir",
            ));
        }
        if self.threads == 0 {
            return Err(config_error("threads must be at least 1", "threads"));
        }
        if self.chunk_size == 0 {
            return Err(config_error("chunk size must be positive", "chunk_size"));
        }
        if self.report_interval.is_zero() {
            return Err(config_error(
                "report interval must be positive",
                "report_interval",
            ));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

// Default value functions
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_day_offset() -> u32 {
    7
}

fn default_threads() -> usize {
    1
}

fn default_chunk_size() -> usize {
    100 * 1024
}

fn default_report_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("vodcast-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
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
