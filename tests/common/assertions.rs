//! Custom test assertions for integration tests

use std::time::Duration;
use teleturbo::{Downloader, Event, Status, TaskId, TaskSnapshot};

/// Result of waiting for a task to finish
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Task completed (`skipped` when the file was already present)
    Completed { skipped: bool },
    /// Task failed with error
    Failed(String),
    /// Task was cancelled
    Cancelled,
    /// Timeout waiting for a terminal event
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the terminal event of `id` on a receiver subscribed before `start`
pub async fn wait_for_terminal_event(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: &TaskId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed {
                    id: event_id,
                    skipped,
                    ..
                }) if event_id == *id => return WaitResult::Completed { skipped },
                Ok(Event::Failed {
                    id: event_id,
                    error,
                }) if event_id == *id => return WaitResult::Failed(error),
                Ok(Event::Cancelled { id: event_id }) if event_id == *id => {
                    return WaitResult::Cancelled;
                }
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Poll until the task reaches `status`
pub async fn wait_for_status(downloader: &Downloader, id: &TaskId, status: Status) -> TaskSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = downloader.progress(id).await.expect("task should be registered");
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

/// Assert the snapshot invariants that must hold at every observation
pub fn assert_consistent(snapshot: &TaskSnapshot) {
    if snapshot.total_bytes > 0 {
        assert!(
            snapshot.downloaded_bytes <= snapshot.total_bytes,
            "transferred {} exceeds total {}",
            snapshot.downloaded_bytes,
            snapshot.total_bytes
        );
    }
    assert!((0.0..=100.0).contains(&snapshot.progress));
    assert!(snapshot.speed_bps >= 0.0);
    if snapshot.status == Status::Error {
        assert!(snapshot.error.is_some());
    }
}
