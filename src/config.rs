//! Configuration types for profile-harvester
//!
//! [`RunConfig`] is the single persisted document shared between runs. It
//! holds the session table and the checkpoint (`last_processed_index`) next to
//! the run settings, so the on-disk JSON stays compatible with the external
//! configuration editor that reads and writes the same file.

use crate::error::{Error, Result};
use crate::types::Session;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder substituted with the percent-encoded identity in
/// [`RunConfig::profile_endpoint`]
pub const IDENTITY_PLACEHOLDER: &str = "{identity}";

/// Persisted run configuration and checkpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Credential sessions, in rotation order
    #[serde(default)]
    pub sessions: Vec<Session>,

    /// Maximum number of active sessions placed in the rotation (default: 5)
    #[serde(default = "default_max_active_sessions")]
    pub max_active_sessions: usize,

    /// Work file (identity, category, city rows)
    #[serde(default)]
    pub input_file: PathBuf,

    /// Result file, appended to one row per fetched profile
    #[serde(default)]
    pub output_file: PathBuf,

    /// Pause after every item, in seconds (default: 5)
    #[serde(default = "default_delay", with = "duration_serde")]
    pub delay: Duration,

    /// Number of items a single run processes (default: 10)
    #[serde(default = "default_count")]
    pub count: usize,

    /// Index of the next item to process
    #[serde(default)]
    pub last_processed_index: usize,

    /// Watchdog deadline for one fetch, in seconds (default: 10)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,

    /// Reference identity read by the session health probe (default: "instagram")
    #[serde(default = "default_probe_identity")]
    pub probe_identity: String,

    /// URL template of the profile service; `{identity}` is substituted
    #[serde(default = "default_profile_endpoint")]
    pub profile_endpoint: String,

    /// Retry policy for transient failures while probing sessions
    #[serde(default = "default_probe_retry")]
    pub probe_retry: RetryConfig,

    /// Keys this crate does not know about, preserved on write-back
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            max_active_sessions: default_max_active_sessions(),
            input_file: PathBuf::new(),
            output_file: PathBuf::new(),
            delay: default_delay(),
            count: default_count(),
            last_processed_index: 0,
            fetch_timeout: default_fetch_timeout(),
            probe_identity: default_probe_identity(),
            profile_endpoint: default_profile_endpoint(),
            probe_retry: default_probe_retry(),
            extra: serde_json::Map::new(),
        }
    }
}

impl RunConfig {
    /// Parse a configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("malformed configuration: {e}"),
            key: None,
        })
    }

    /// Check the settings a run cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.input_file.as_os_str().is_empty() {
            return Err(Error::config("input_file must be set", "input_file"));
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(Error::config("output_file must be set", "output_file"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::config(
                "fetch_timeout must be greater than zero",
                "fetch_timeout",
            ));
        }
        if !self.profile_endpoint.contains(IDENTITY_PLACEHOLDER) {
            return Err(Error::config(
                format!("profile_endpoint must contain {IDENTITY_PLACEHOLDER}"),
                "profile_endpoint",
            ));
        }
        Ok(())
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_max_active_sessions() -> usize {
    5
}

fn default_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_count() -> usize {
    10
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_probe_identity() -> String {
    "instagram".to_string()
}

fn default_profile_endpoint() -> String {
    format!("http://127.0.0.1:8080/profiles/{IDENTITY_PLACEHOLDER}")
}

// Probing hits the upstream once per session; keep retries short.
fn default_probe_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        max_delay: Duration::from_secs(10),
        ..RetryConfig::default()
    }
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds on disk)
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
