//! Keyed session registry.
//!
//! One independently owned `Session` per subject, created atomically on first
//! use. The per-subject mutex enforces the single-writer discipline frames
//! require; the outer map lock is held only for lookup and insertion, never
//! across an ingest.

use crate::classifier::ClassifierPort;
use crate::config::EngineConfig;
use crate::core::session::{Session, Snapshot};
use crate::events::EpisodeSender;
use crate::signal::{FrameSignals, SignalError};
use crate::stats::SharedStats;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Concurrency-safe subject-key to session map.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    config: EngineConfig,
    classifier: Arc<dyn ClassifierPort>,
    episodes: EpisodeSender,
    stats: SharedStats,
}

impl SessionRegistry {
    pub fn new(
        config: EngineConfig,
        classifier: Arc<dyn ClassifierPort>,
        episodes: EpisodeSender,
        stats: SharedStats,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
            classifier,
            episodes,
            stats,
        }
    }

    /// Get the subject's session, creating it atomically if absent.
    pub fn session(&self, subject: &str) -> Arc<Mutex<Session>> {
        let mut sessions = lock(&self.sessions);
        sessions
            .entry(subject.to_string())
            .or_insert_with(|| {
                tracing::info!(subject, "creating session");
                Arc::new(Mutex::new(Session::new(
                    subject.to_string(),
                    self.config.clone(),
                    Arc::clone(&self.classifier),
                    self.episodes.clone(),
                    Arc::clone(&self.stats),
                )))
            })
            .clone()
    }

    /// Feed one frame to the subject's session.
    pub fn ingest(&self, subject: &str, signals: &FrameSignals) -> Result<Snapshot, SignalError> {
        let session = self.session(subject);
        let mut session = lock(&session);
        session.ingest(signals)
    }

    /// Reset the subject's session to a freshly initialized one.
    ///
    /// Creates the session if it does not exist yet, matching the behavior of
    /// an explicit reset command arriving before the first frame.
    pub fn reset(&self, subject: &str) {
        let session = self.session(subject);
        let mut session = lock(&session);
        session.reset();
    }

    /// Tear down the subject's session. Future frames recreate it.
    pub fn remove(&self, subject: &str) -> bool {
        lock(&self.sessions).remove(subject).is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }

    /// Engine-wide counters shared by all sessions.
    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }
}

/// Lock, recovering from a poisoned mutex: session state stays consistent
/// between frames, so continuing after a panicked writer is safe.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::HeuristicClassifier;
    use crate::stats::EngineStats;

    fn registry() -> SessionRegistry {
        let stats = Arc::new(EngineStats::new());
        let (episodes, _rx) = EpisodeSender::bounded(16, stats.clone());
        SessionRegistry::new(
            EngineConfig::default(),
            Arc::new(HeuristicClassifier::default()),
            episodes,
            stats,
        )
    }

    #[test]
    fn test_create_if_absent() {
        let registry = registry();
        assert!(registry.is_empty());

        let a = registry.session("alice");
        let b = registry.session("alice");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);

        registry.session("bob");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_creation_resolves_to_one_session() {
        let registry = Arc::new(registry());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.session("shared"))
            })
            .collect();

        let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for session in &sessions[1..] {
            assert!(Arc::ptr_eq(&sessions[0], session));
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ingest_creates_session() {
        let registry = registry();
        let snapshot = registry
            .ingest("carol", &FrameSignals::cues(false, false))
            .unwrap();
        assert!(!snapshot.ready);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let registry = registry();
        registry.session("dave");
        assert!(registry.remove("dave"));
        assert!(!registry.remove("dave"));
        assert!(registry.is_empty());
    }
}
