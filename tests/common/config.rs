//! Test configuration rooted in scratch directories

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use teleturbo::{Config, Downloader, Session};

use super::fakes::{MemoryEngine, ScriptedApi, ScriptedConnector};

/// Configuration whose session file and default destination live under `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.session.session_dir = dir.join("session");
    config.session.connect_timeout = Duration::from_millis(200);
    config.download.default_destination = dir.join("downloads").to_string_lossy().into_owned();
    config.telemetry.sample_interval = Duration::from_millis(10);
    config
}

/// Initialize a session over `api` (authorized when `api` says so)
pub async fn connect(api: Arc<ScriptedApi>, dir: &Path) -> Session {
    Session::initialize(
        ScriptedConnector::new(api),
        12345,
        "0123456789abcdef",
        test_config(dir).session,
    )
    .await
    .expect("session should initialize")
}

/// Authenticated downloader over the standard fixture channel
pub async fn create_test_downloader(engine: Arc<MemoryEngine>) -> (Downloader, Arc<ScriptedApi>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let api = ScriptedApi::with_fixtures();
    api.authorize();
    let session = connect(api.clone(), temp_dir.path()).await;
    let downloader = Downloader::new(session, engine, test_config(temp_dir.path()))
        .expect("config should validate");
    (downloader, api, temp_dir)
}
