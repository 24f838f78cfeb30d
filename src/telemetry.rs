//! Progress telemetry: rolling byte-count samples, speed, ETA.
//!
//! One sampler runs per active task. Each tick it records the byte delta
//! since the previous tick in a bounded [`SampleWindow`] and broadcasts a
//! [`Event::Downloading`] update.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::types::{Event, TaskId};

/// One sampler tick: bytes transferred since the previous tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Byte delta
    pub bytes: u64,
    /// When the delta was observed
    pub at: Instant,
}

/// Bounded, time-ordered window of samples
#[derive(Clone, Debug)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleWindow {
    /// Window keeping at most `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a delta observed now
    pub fn push(&mut self, bytes: u64) {
        self.push_at(bytes, Instant::now());
    }

    /// Record a delta observed at `at`, evicting the oldest sample past capacity.
    ///
    /// Samples older than the newest one are clamped to its timestamp so the
    /// window stays time-ordered.
    pub fn push_at(&mut self, bytes: u64, at: Instant) {
        let at = match self.samples.back() {
            Some(last) if at < last.at => last.at,
            _ => at,
        };
        self.samples.push_back(Sample { bytes, at });
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True before the first sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Smoothed speed in bytes per second over the whole window.
    ///
    /// Zero with fewer than two samples. Otherwise the deltas of every sample
    /// after the first, divided by the time between first and last sample.
    pub fn speed(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last.at.duration_since(first.at).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        let bytes: u64 = self.samples.iter().skip(1).map(|s| s.bytes).sum();
        bytes as f64 / elapsed
    }
}

/// Time left at `speed` bytes per second; zero when speed is unknown,
/// saturating at [`Duration::MAX`]
pub fn eta(remaining_bytes: u64, speed: f64) -> Duration {
    if speed <= 0.0 || !speed.is_finite() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(remaining_bytes as f64 / speed).unwrap_or(Duration::MAX)
}

/// Percentage in `[0, 100]`; zero while the total is unknown
pub fn progress_percent(transferred: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (transferred.min(total) as f64 / total as f64) * 100.0
}

/// Parameters for spawning a sampler
pub(crate) struct SamplerParams<F> {
    /// Task being sampled
    pub id: TaskId,
    /// Tick interval
    pub interval: Duration,
    /// Window shared with progress readers
    pub window: Arc<Mutex<SampleWindow>>,
    /// Reads `(transferred, total)` for the task
    pub progress: F,
    /// Event broadcast sender
    pub event_tx: broadcast::Sender<Event>,
    /// Stops the sampler
    pub cancel_token: CancellationToken,
}

/// Spawn a sampler that ticks until `cancel_token` fires.
pub(crate) fn spawn_sampler<F>(params: SamplerParams<F>) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> (u64, u64) + Send + 'static,
{
    let SamplerParams {
        id,
        interval,
        window,
        progress,
        event_tx,
        cancel_token,
    } = params;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut previous = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    tracing::trace!(task_id = %id, "Sampler stopped");
                    break;
                }
                _ = interval.tick() => {
                    let (transferred, total) = progress();
                    let delta = transferred.saturating_sub(previous);
                    previous = transferred;

                    let speed_bps = {
                        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
                        window.push(delta);
                        window.speed()
                    };

                    event_tx
                        .send(Event::Downloading {
                            id: id.clone(),
                            percent: progress_percent(transferred, total),
                            speed_bps,
                        })
                        .ok();
                }
            }
        }
    })
}
