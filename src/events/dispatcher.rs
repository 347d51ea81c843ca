//! Asynchronous episode dispatch.
//!
//! Sessions hand episodes to a bounded crossbeam channel and return
//! immediately; a dedicated worker thread drains the queue into the sink.
//! A full queue drops the episode with a warning rather than blocking.

use crate::events::sink::EventSink;
use crate::events::FatigueEpisode;
use crate::stats::SharedStats;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Cloneable, non-blocking handle used by sessions to emit episodes.
#[derive(Debug, Clone)]
pub struct EpisodeSender {
    tx: Sender<FatigueEpisode>,
    stats: SharedStats,
}

impl EpisodeSender {
    /// Create a sender with its receiving end, for wiring up a worker or for
    /// tests that want to observe emissions directly.
    pub fn bounded(capacity: usize, stats: SharedStats) -> (Self, Receiver<FatigueEpisode>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx, stats }, rx)
    }

    /// Queue an episode without blocking. A full or closed queue drops the
    /// episode; delivery is best-effort by contract.
    pub fn dispatch(&self, episode: FatigueEpisode) {
        match self.tx.try_send(episode) {
            Ok(()) => self.stats.record_episode_emitted(),
            Err(TrySendError::Full(episode)) => {
                self.stats.record_episode_dropped();
                tracing::warn!(
                    subject = %episode.subject,
                    "episode queue full, dropping episode"
                );
            }
            Err(TrySendError::Disconnected(episode)) => {
                self.stats.record_episode_dropped();
                tracing::warn!(
                    subject = %episode.subject,
                    "episode worker gone, dropping episode"
                );
            }
        }
    }
}

/// Owns the queue worker that delivers episodes to the sink.
pub struct EpisodeDispatcher {
    sender: EpisodeSender,
    worker: Option<JoinHandle<()>>,
}

impl EpisodeDispatcher {
    /// Spawn the worker thread draining into `sink`.
    pub fn new(sink: Arc<dyn EventSink>, capacity: usize, stats: SharedStats) -> Self {
        let (sender, rx) = EpisodeSender::bounded(capacity, stats.clone());

        let worker = std::thread::Builder::new()
            .name("episode-dispatch".to_string())
            .spawn(move || run_worker(rx, sink, stats))
            .ok();

        if worker.is_none() {
            tracing::warn!("could not spawn episode worker, episodes will be dropped");
        }

        Self { sender, worker }
    }

    /// Handle for sessions to emit episodes through.
    pub fn sender(&self) -> EpisodeSender {
        self.sender.clone()
    }

    /// Stop accepting episodes and wait for the queue to drain.
    ///
    /// Any remaining `EpisodeSender` clones keep the channel open; drop them
    /// before calling this or the join will wait for them.
    pub fn shutdown(self) {
        let Self { sender, worker } = self;
        drop(sender);
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

fn run_worker(rx: Receiver<FatigueEpisode>, sink: Arc<dyn EventSink>, stats: SharedStats) {
    for episode in rx.iter() {
        if let Err(e) = sink.record(&episode) {
            // Never retried: at-most-once delivery.
            stats.record_sink_failure();
            tracing::warn!(
                subject = %episode.subject,
                error = %e,
                "episode sink failed"
            );
        } else {
            tracing::debug!(subject = %episode.subject, "episode recorded");
        }
    }
}
