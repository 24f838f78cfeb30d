//! Configuration types for teleturbo

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Session and connection settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding persisted session material (default: "<tmp>/.teleturbo")
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,

    /// Session file name inside `session_dir` (default: "session.json")
    #[serde(default = "default_session_file")]
    pub session_file: String,

    /// How long initialization waits for the connection to report ready (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Bound on each login RPC (default: 30 seconds)
    #[serde(default = "default_rpc_timeout", with = "duration_serde")]
    pub rpc_timeout: Duration,

    /// Bound on the logout RPC (default: 10 seconds)
    #[serde(default = "default_logout_timeout", with = "duration_serde")]
    pub logout_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_dir: default_session_dir(),
            session_file: default_session_file(),
            connect_timeout: default_connect_timeout(),
            rpc_timeout: default_rpc_timeout(),
            logout_timeout: default_logout_timeout(),
        }
    }
}

impl SessionConfig {
    /// Full path of the persisted session file
    pub fn session_path(&self) -> PathBuf {
        self.session_dir.join(&self.session_file)
    }
}

/// Download behavior settings (destination, concurrency degree, resolution)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Destination used when a download is started with an empty one
    /// (default: "~/Downloads/TeleTurbo")
    #[serde(default = "default_destination")]
    pub default_destination: String,

    /// Lower clamp of the concurrency degree (default: 4)
    #[serde(default = "default_min_threads")]
    pub min_threads: usize,

    /// Upper clamp of the concurrency degree (default: 16)
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    /// Streams per available core before clamping (default: 2)
    #[serde(default = "default_threads_per_core")]
    pub threads_per_core: usize,

    /// Bound on each resolution step (default: 30 seconds)
    #[serde(default = "default_resolve_timeout", with = "duration_serde")]
    pub resolve_timeout: Duration,

    /// Page size when enumerating dialogs to find a private channel (default: 100)
    #[serde(default = "default_dialog_page_size")]
    pub dialog_page_size: i32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            default_destination: default_destination(),
            min_threads: default_min_threads(),
            max_threads: default_max_threads(),
            threads_per_core: default_threads_per_core(),
            resolve_timeout: default_resolve_timeout(),
            dialog_page_size: default_dialog_page_size(),
        }
    }
}

/// Progress telemetry settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Sampling interval (default: 500 ms)
    #[serde(default = "default_sample_interval", with = "millis_serde")]
    pub sample_interval: Duration,

    /// Number of samples kept for speed estimation (default: 10)
    #[serde(default = "default_sample_window")]
    pub sample_window: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            sample_window: default_sample_window(),
        }
    }
}

/// Main configuration
///
/// Fields are organized into logical sub-configs:
/// - [`session`](SessionConfig) - session file, connection and RPC timeouts
/// - [`download`](DownloadConfig) - destination, concurrency degree, resolution
/// - [`telemetry`](TelemetryConfig) - speed sampling
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session and connection settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Progress telemetry settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Reject settings the task manager cannot honor
    pub fn validate(&self) -> Result<()> {
        let download = &self.download;
        if download.min_threads == 0 {
            return Err(config_error("min_threads must be at least 1", "min_threads"));
        }
        if download.min_threads > download.max_threads {
            return Err(config_error(
                "min_threads must not exceed max_threads",
                "max_threads",
            ));
        }
        if download.threads_per_core == 0 {
            return Err(config_error(
                "threads_per_core must be at least 1",
                "threads_per_core",
            ));
        }
        if download.dialog_page_size <= 0 {
            return Err(config_error(
                "dialog_page_size must be positive",
                "dialog_page_size",
            ));
        }
        if self.telemetry.sample_window < 2 {
            return Err(config_error(
                "sample_window must hold at least 2 samples",
                "sample_window",
            ));
        }
        if self.telemetry.sample_interval.is_zero() {
            return Err(config_error(
                "sample_interval must be non-zero",
                "sample_interval",
            ));
        }

        let timeouts = [
            ("connect_timeout", self.session.connect_timeout),
            ("rpc_timeout", self.session.rpc_timeout),
            ("logout_timeout", self.session.logout_timeout),
            ("resolve_timeout", download.resolve_timeout),
        ];
        for (key, value) in timeouts {
            if value.is_zero() {
                return Err(config_error(&format!("{key} must be non-zero"), key));
            }
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_session_dir() -> PathBuf {
    std::env::temp_dir().join(".teleturbo")
}

fn default_session_file() -> String {
    "session.json".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_rpc_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_logout_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_destination() -> String {
    "~/Downloads/TeleTurbo".to_string()
}

fn default_min_threads() -> usize {
    4
}

fn default_max_threads() -> usize {
    16
}

fn default_threads_per_core() -> usize {
    2
}

fn default_resolve_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_dialog_page_size() -> i32 {
    100
}

fn default_sample_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_sample_window() -> usize {
    10
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

// Sub-second intervals are stored as integer milliseconds
mod millis_serde {
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
