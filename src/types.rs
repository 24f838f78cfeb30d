//! Core types for teleturbo

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a download task (16 lowercase hex characters)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random identity from 8 random bytes
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Borrow the identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Download task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Registered, execution not started yet
    Pending,
    /// Resolving or transferring
    Downloading,
    /// Transfer finished (or the file was already present)
    Completed,
    /// Failed with an error message
    Error,
    /// Cancelled by the caller
    Cancelled,
}

impl Status {
    /// Terminal statuses never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Error | Status::Cancelled)
    }

    /// Lowercase name as shown to shells
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Downloading => "downloading",
            Status::Completed => "completed",
            Status::Error => "error",
            Status::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent point-in-time view of one download task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identity
    pub id: TaskId,
    /// Link the task was started with
    pub link: String,
    /// Destination directory as requested
    pub destination: String,
    /// Resolved filename (empty until resolved)
    pub filename: String,
    /// Current status
    pub status: Status,
    /// Bytes written so far (never exceeds `total_bytes` once known)
    pub downloaded_bytes: u64,
    /// Total size in bytes (0 until resolved)
    pub total_bytes: u64,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f64,
    /// Smoothed speed in bytes per second
    pub speed_bps: f64,
    /// Estimated seconds remaining (0 when speed is unknown)
    pub eta_secs: u64,
    /// Error message when `status` is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the task was registered
    pub started_at: DateTime<Utc>,
    /// When the task reached `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Event emitted during a download's lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task registered
    Queued {
        /// Task identity
        id: TaskId,
        /// Source link
        link: String,
    },

    /// Remote file resolved
    Resolved {
        /// Task identity
        id: TaskId,
        /// Resolved filename
        filename: String,
        /// Total size in bytes
        total_bytes: u64,
    },

    /// Periodic progress update (one per telemetry tick)
    Downloading {
        /// Task identity
        id: TaskId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
        /// Smoothed speed in bytes per second
        speed_bps: f64,
    },

    /// Download completed
    Completed {
        /// Task identity
        id: TaskId,
        /// Final file path
        path: PathBuf,
        /// True when an identical-size file was already present
        skipped: bool,
    },

    /// Download failed
    Failed {
        /// Task identity
        id: TaskId,
        /// Error message
        error: String,
    },

    /// Download cancelled by the caller
    Cancelled {
        /// Task identity
        id: TaskId,
    },
}

/// Host information used to size the concurrency degree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Available parallelism reported by the OS
    pub cpu_cores: usize,
    /// Concurrency degree a new download would use
    pub parallelism: usize,
    /// Target operating system
    pub os: String,
    /// Target architecture
    pub arch: String,
}
