//! Utility functions for destination paths and concurrency sizing

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::DownloadConfig;
use crate::resolver::DEFAULT_DOCUMENT_FILENAME;
use crate::types::SystemInfo;

/// Expand a leading `~` to the user's home directory
///
/// Only a bare `~` or a `~/` prefix is expanded; `~user` forms and paths
/// without the marker are returned unchanged. The home directory comes from
/// `HOME`, falling back to `USERPROFILE`.
///
/// # Examples
///
/// ```
/// use teleturbo::utils::expand_home;
/// use std::path::PathBuf;
///
/// assert_eq!(expand_home("/srv/media").unwrap(), PathBuf::from("/srv/media"));
/// ```
pub fn expand_home(path: &str) -> io::Result<PathBuf> {
    if !is_home_relative(path) {
        return Ok(PathBuf::from(path));
    }
    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "HOME not found"))?;
    Ok(expand_home_with(path, &home))
}

fn is_home_relative(path: &str) -> bool {
    path == "~" || path.starts_with("~/")
}

fn expand_home_with(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if is_home_relative(path) => {
            let rest = rest.trim_start_matches('/');
            if rest.is_empty() {
                home.to_path_buf()
            } else {
                home.join(rest)
            }
        }
        _ => PathBuf::from(path),
    }
}

/// Last path component of a remote filename
///
/// Keeps a resolved name from escaping the destination directory. Names that
/// reduce to nothing fall back to `download.bin`.
pub fn safe_file_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        DEFAULT_DOCUMENT_FILENAME.to_string()
    } else {
        name.to_string()
    }
}

/// Parallelism reported by the OS (1 when unknown)
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Number of parallel streams for one download
///
/// `cores × threads_per_core`, clamped to `[min_threads, max_threads]`.
///
/// # Examples
///
/// ```
/// use teleturbo::config::DownloadConfig;
/// use teleturbo::utils::concurrency_degree;
///
/// let config = DownloadConfig::default();
/// assert_eq!(concurrency_degree(1, &config), 4);
/// assert_eq!(concurrency_degree(4, &config), 8);
/// assert_eq!(concurrency_degree(64, &config), 16);
/// ```
pub fn concurrency_degree(cores: usize, config: &DownloadConfig) -> usize {
    let max = config.max_threads.max(config.min_threads);
    cores
        .saturating_mul(config.threads_per_core)
        .clamp(config.min_threads, max)
}

/// Host details for shells
pub fn system_info(config: &DownloadConfig) -> SystemInfo {
    let cores = available_parallelism();
    SystemInfo {
        cpu_cores: cores,
        parallelism: concurrency_degree(cores, config),
        os: env::consts::OS.to_string(),
        arch: env::consts::ARCH.to_string(),
    }
}
