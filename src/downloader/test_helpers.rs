//! Shared test helpers for creating Downloader instances in tests.

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use crate::config::Config;
use crate::downloader::Downloader;
use crate::rpc::ChannelPeer;
use crate::test_helpers::{FakeApi, FakeEngine, authenticated_session, document};
use crate::types::{Status, TaskId, TaskSnapshot};

/// Public channel every test fixture message lives in
pub(crate) const TEST_PEER: ChannelPeer = ChannelPeer {
    id: 1234567890,
    access_hash: 42,
};

/// Link to a 200 KiB document named `movie.mkv`
pub(crate) const MOVIE_LINK: &str = "https://t.me/examplechannel/55";
pub(crate) const MOVIE_SIZE: u64 = 200 * 1024;

/// Link to a message that does not exist
pub(crate) const MISSING_LINK: &str = "https://t.me/examplechannel/404";

/// Helper to create a test Downloader over an authenticated fake session.
/// Returns the downloader, the fake remote and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    engine: Arc<FakeEngine>,
) -> (Downloader, Arc<FakeApi>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let api = Arc::new(FakeApi::default());
    api.add_public_channel("examplechannel", TEST_PEER);
    api.add_dialog(TEST_PEER);
    api.add_message(TEST_PEER.id, 55, document("movie.mkv", MOVIE_SIZE as i64));

    let session = authenticated_session(api.clone(), temp_dir.path()).await;

    let mut config = Config::default();
    config.session = crate::test_helpers::session_config(temp_dir.path());
    config.download.default_destination = temp_dir
        .path()
        .join("downloads")
        .to_string_lossy()
        .into_owned();
    config.telemetry.sample_interval = Duration::from_millis(10);

    let downloader = Downloader::new(session, engine, config).unwrap();
    (downloader, api, temp_dir)
}

/// Poll until the task reaches `status` (panics after 5 seconds)
pub(crate) async fn wait_for_status(
    downloader: &Downloader,
    id: &TaskId,
    status: Status,
) -> TaskSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = downloader.progress(id).await.unwrap();
        if snapshot.status == status {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} stuck in {} waiting for {status}",
            snapshot.status
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until the task has transferred at least one byte
pub(crate) async fn wait_for_bytes(downloader: &Downloader, id: &TaskId) -> TaskSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = downloader.progress(id).await.unwrap();
        if snapshot.downloaded_bytes > 0 {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} transferred nothing"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
