//! Engine-wide counters for observability.
//!
//! Plain atomics shared across sessions and the episode worker; surfaced
//! through the `/status` endpoint and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the running engine.
#[derive(Debug)]
pub struct EngineStats {
    frames_ingested: AtomicU64,
    frames_rejected: AtomicU64,
    ticks_processed: AtomicU64,
    classifier_failures: AtomicU64,
    episodes_emitted: AtomicU64,
    episodes_dropped: AtomicU64,
    sink_failures: AtomicU64,
    started: DateTime<Utc>,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            frames_ingested: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            ticks_processed: AtomicU64::new(0),
            classifier_failures: AtomicU64::new(0),
            episodes_emitted: AtomicU64::new(0),
            episodes_dropped: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            started: Utc::now(),
        }
    }

    pub fn record_frame(&self) {
        self.frames_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classifier_failure(&self) {
        self.classifier_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_episode_emitted(&self) {
        self.episodes_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_episode_dropped(&self) {
        self.episodes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_ingested: self.frames_ingested.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            ticks_processed: self.ticks_processed.load(Ordering::Relaxed),
            classifier_failures: self.classifier_failures.load(Ordering::Relaxed),
            episodes_emitted: self.episodes_emitted.load(Ordering::Relaxed),
            episodes_dropped: self.episodes_dropped.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            uptime_secs: (Utc::now() - self.started).num_seconds().max(0) as u64,
        }
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the engine counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_ingested: u64,
    pub frames_rejected: u64,
    pub ticks_processed: u64,
    pub classifier_failures: u64,
    pub episodes_emitted: u64,
    pub episodes_dropped: u64,
    pub sink_failures: u64,
    pub uptime_secs: u64,
}

/// Thread-safe shared stats handle.
pub type SharedStats = Arc<EngineStats>;
