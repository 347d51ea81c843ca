//! Per-subject fusion session.
//!
//! A session owns one aggregator, one hysteresis engine, and one state
//! machine, and is the single writer for all of them: frames must arrive in
//! order, so callers serialize access (the registry wraps each session in its
//! own mutex). Every ingested frame returns a snapshot; classification only
//! happens on ready ticks.

use crate::classifier::{ClassifierError, ClassifierPort};
use crate::config::EngineConfig;
use crate::core::aggregator::{FrameOutcome, WindowAggregator};
use crate::core::hysteresis::{HysteresisEngine, RawLabels};
use crate::core::state::{FatigueLevel, FatigueState, FatigueStateMachine};
use crate::events::{EpisodeSender, FatigueEpisode};
use crate::signal::{Detection, FrameSignals, SignalError};
use crate::stats::SharedStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-frame view of the session returned by `ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Debounced fatigue level (Initializing until warm-up completes)
    pub fatigue_level: FatigueState,
    /// Debounced sustained-eye-closure flag
    pub eye_closure: bool,
    /// Debounced yawn flag
    pub yawn_detected: bool,
    /// Seconds spent in the current state
    pub current_state_duration: f64,
    /// Detection boxes passed through from the upstream detector
    pub detections: Vec<Detection>,
    /// Whether the warm-up phase has completed
    pub ready: bool,
    /// Classifier failure on this tick, if any; labels were held
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_error: Option<String>,
}

/// One monitored subject's fusion state.
pub struct Session {
    subject: String,
    config: EngineConfig,
    classifier: Arc<dyn ClassifierPort>,
    episodes: EpisodeSender,
    stats: SharedStats,
    aggregator: WindowAggregator,
    hysteresis: HysteresisEngine,
    state: FatigueStateMachine,
}

impl Session {
    pub fn new(
        subject: String,
        config: EngineConfig,
        classifier: Arc<dyn ClassifierPort>,
        episodes: EpisodeSender,
        stats: SharedStats,
    ) -> Self {
        let aggregator = WindowAggregator::new(&config);
        let hysteresis = HysteresisEngine::new(config.hysteresis.clone());
        Self {
            subject,
            config,
            classifier,
            episodes,
            stats,
            aggregator,
            hysteresis,
            state: FatigueStateMachine::new(),
        }
    }

    /// Feed one frame and return the current snapshot.
    ///
    /// Malformed input is rejected before any accumulator is touched. A
    /// classifier failure on a tick keeps that tick's window updates but
    /// holds labels and counters at their previous values (fail-closed).
    pub fn ingest(&mut self, signals: &FrameSignals) -> Result<Snapshot, SignalError> {
        if let Err(e) = signals.validate() {
            self.stats.record_frame_rejected();
            return Err(e);
        }
        self.stats.record_frame();

        let outcome = self
            .aggregator
            .push_frame(signals.eye_closed_detected, signals.mouth_open_detected);

        let mut classifier_error = None;
        match outcome {
            FrameOutcome::Accumulated | FrameOutcome::TickWarming => {}
            FrameOutcome::TickBecameReady => {
                self.stats.record_tick();
                // Warm-up complete: forced Initializing -> Low transition.
                // Classification starts on the next tick.
                self.state.observe(FatigueLevel::Low);
            }
            FrameOutcome::TickReady => {
                self.stats.record_tick();
                match self.classify() {
                    Ok(raw) => self.fuse(raw),
                    Err(e) => {
                        self.stats.record_classifier_failure();
                        tracing::warn!(
                            subject = %self.subject,
                            error = %e,
                            "classifier failed, holding labels for this tick"
                        );
                        classifier_error = Some(e.to_string());
                    }
                }
            }
        }

        Ok(self.snapshot_with(signals.detections.clone(), classifier_error))
    }

    /// Invoke the three classifiers on the current window contents.
    fn classify(&mut self) -> Result<RawLabels, ClassifierError> {
        let classifier = Arc::clone(&self.classifier);
        let fatigue = classifier.fatigue(self.aggregator.combined_mut().samples())?;
        let eye_closure = classifier.eye_closure(self.aggregator.eye_mut().samples())?;
        let yawn = classifier.yawn(self.aggregator.yawn_mut().samples())?;
        Ok(RawLabels {
            fatigue,
            eye_closure,
            yawn,
        })
    }

    /// Apply one tick's raw labels: hysteresis, episode gating, soft reset,
    /// and the state machine, in that order.
    fn fuse(&mut self, raw: RawLabels) {
        let update = self.hysteresis.apply(raw);

        // Episode gating uses the pre-reset labels: a tick that confirms High
        // alerts even if the low-confirm reset fires on the same tick.
        if update.displayed.fatigue == FatigueLevel::High && !self.state.episode_logged() {
            tracing::info!(subject = %self.subject, "high fatigue confirmed, dispatching episode");
            self.episodes.dispatch(FatigueEpisode::high(&self.subject));
            self.state.mark_episode_logged();
        }

        if update.soft_reset {
            self.aggregator.zero_fill_all();
        }

        self.state.observe(self.hysteresis.displayed().fatigue);
    }

    /// Replace the session's internal state with a freshly initialized one.
    ///
    /// Unlike the low-confirm soft reset, this also clears readiness.
    pub fn reset(&mut self) {
        tracing::info!(subject = %self.subject, "session reset");
        self.aggregator = WindowAggregator::new(&self.config);
        self.hysteresis = HysteresisEngine::new(self.config.hysteresis.clone());
        self.state = FatigueStateMachine::new();
    }

    /// Whether the warm-up phase has completed.
    pub fn is_ready(&self) -> bool {
        self.aggregator.is_ready()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The current snapshot without ingesting a frame.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_with(Vec::new(), None)
    }

    fn snapshot_with(
        &self,
        detections: Vec<Detection>,
        classifier_error: Option<String>,
    ) -> Snapshot {
        let displayed = self.hysteresis.displayed();
        Snapshot {
            fatigue_level: self.state.state(),
            eye_closure: displayed.eye_closure,
            yawn_detected: displayed.yawn,
            current_state_duration: self.state.state_duration_secs(),
            detections,
            ready: self.aggregator.is_ready(),
            classifier_error,
        }
    }

    /// Window state, for observability and tests.
    pub fn aggregator(&self) -> &WindowAggregator {
        &self.aggregator
    }

    /// Debounce counter state, for observability and tests.
    pub fn hysteresis(&self) -> &HysteresisEngine {
        &self.hysteresis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HysteresisConfig;
    use crate::stats::EngineStats;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Classifier whose outputs the test controls.
    struct StubClassifier {
        fatigue: std::sync::Mutex<FatigueLevel>,
        eye: AtomicBool,
        yawn: AtomicBool,
        fail: AtomicBool,
    }

    impl StubClassifier {
        fn new() -> Self {
            Self {
                fatigue: std::sync::Mutex::new(FatigueLevel::Low),
                eye: AtomicBool::new(false),
                yawn: AtomicBool::new(false),
                fail: AtomicBool::new(false),
            }
        }

        fn set_fatigue(&self, level: FatigueLevel) {
            *self.fatigue.lock().unwrap() = level;
        }

        fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    impl ClassifierPort for StubClassifier {
        fn fatigue(&self, _window: &[f64]) -> Result<FatigueLevel, ClassifierError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClassifierError::Backend("model offline".to_string()));
            }
            Ok(*self.fatigue.lock().unwrap())
        }

        fn eye_closure(&self, _window: &[f64]) -> Result<bool, ClassifierError> {
            Ok(self.eye.load(Ordering::SeqCst))
        }

        fn yawn(&self, _window: &[f64]) -> Result<bool, ClassifierError> {
            Ok(self.yawn.load(Ordering::SeqCst))
        }
    }

    fn small_config() -> EngineConfig {
        EngineConfig {
            fatigue_lag: 2,
            eye_lag: 2,
            yawn_lag: 2,
            hysteresis: HysteresisConfig::default(),
            ..EngineConfig::default()
        }
    }

    fn session_with(
        config: EngineConfig,
        classifier: Arc<StubClassifier>,
    ) -> (Session, crossbeam_channel::Receiver<FatigueEpisode>) {
        let stats = Arc::new(EngineStats::new());
        let (episodes, rx) = EpisodeSender::bounded(16, stats.clone());
        let session = Session::new("test".to_string(), config, classifier, episodes, stats);
        (session, rx)
    }

    fn tick(session: &mut Session, signals: &FrameSignals) -> Snapshot {
        let mut last = None;
        for _ in 0..5 {
            last = Some(session.ingest(signals).unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn test_initializing_until_ready() {
        let classifier = Arc::new(StubClassifier::new());
        let (mut session, _rx) = session_with(small_config(), classifier);
        let signals = FrameSignals::cues(false, false);

        // lags 2/2/2: ready latches on tick 2.
        let snap = tick(&mut session, &signals);
        assert_eq!(snap.fatigue_level, FatigueState::Initializing);
        assert!(!snap.ready);

        let snap = tick(&mut session, &signals);
        assert_eq!(snap.fatigue_level, FatigueState::Low);
        assert!(snap.ready);
        assert!(session.is_ready());
    }

    #[test]
    fn test_snapshot_every_frame_not_just_ticks() {
        let classifier = Arc::new(StubClassifier::new());
        let (mut session, _rx) = session_with(small_config(), classifier);
        let signals = FrameSignals::cues(true, false);

        for _ in 0..3 {
            let snap = session.ingest(&signals).unwrap();
            assert_eq!(snap.fatigue_level, FatigueState::Initializing);
        }
        assert_eq!(session.aggregator().frames_seen(), 3);
    }

    #[test]
    fn test_classifier_failure_holds_labels() {
        let classifier = Arc::new(StubClassifier::new());
        let (mut session, _rx) = session_with(small_config(), classifier.clone());
        let signals = FrameSignals::cues(true, true);

        // Warm up (tick 2 = became ready), then one classified tick.
        tick(&mut session, &signals);
        tick(&mut session, &signals);
        classifier.set_fatigue(FatigueLevel::Medium);
        let snap = tick(&mut session, &signals);
        assert_eq!(snap.fatigue_level, FatigueState::Medium);

        // Failing tick: windows still advance, labels and counters hold.
        classifier.set_fail(true);
        let counters_before = session.hysteresis().counters();
        let frames_before = session.aggregator().frames_seen();
        let snap = tick(&mut session, &signals);

        assert!(snap.classifier_error.is_some());
        assert_eq!(snap.fatigue_level, FatigueState::Medium);
        assert_eq!(session.aggregator().frames_seen(), frames_before + 5);
        let counters_after = session.hysteresis().counters();
        assert_eq!(counters_after.low_confirm, counters_before.low_confirm);
        assert_eq!(counters_after.high_fatigue, counters_before.high_fatigue);

        // Recovery on the next tick.
        classifier.set_fail(false);
        let snap = tick(&mut session, &signals);
        assert!(snap.classifier_error.is_none());
    }

    #[test]
    fn test_malformed_frame_rejected_before_mutation() {
        let classifier = Arc::new(StubClassifier::new());
        let (mut session, _rx) = session_with(small_config(), classifier);

        let bad = FrameSignals {
            eye_closed_detected: true,
            mouth_open_detected: false,
            detections: vec![Detection {
                class: "closed_eye".to_string(),
                confidence: f64::NAN,
                bbox: [0, 0, 1, 1],
            }],
        };

        assert!(session.ingest(&bad).is_err());
        assert_eq!(session.aggregator().frames_seen(), 0);
    }

    #[test]
    fn test_reset_equivalent_to_fresh_session() {
        let classifier = Arc::new(StubClassifier::new());
        let (mut session, _rx) = session_with(small_config(), classifier.clone());
        let signals = FrameSignals::cues(true, true);

        classifier.set_fatigue(FatigueLevel::High);
        for _ in 0..10 {
            tick(&mut session, &signals);
        }
        assert!(session.is_ready());

        session.reset();

        assert!(!session.is_ready());
        assert_eq!(session.aggregator().frames_seen(), 0);
        assert!(session.aggregator().combined().is_empty());
        let counters = session.hysteresis().counters();
        assert_eq!(counters.high_fatigue, 0);
        assert_eq!(counters.low_confirm, 0);
        assert_eq!(session.snapshot().fatigue_level, FatigueState::Initializing);
    }

    #[test]
    fn test_detections_passed_through() {
        let classifier = Arc::new(StubClassifier::new());
        let (mut session, _rx) = session_with(small_config(), classifier);

        let signals = FrameSignals {
            eye_closed_detected: false,
            mouth_open_detected: false,
            detections: vec![Detection {
                class: "face".to_string(),
                confidence: 0.88,
                bbox: [5, 5, 100, 120],
            }],
        };

        let snap = session.ingest(&signals).unwrap();
        assert_eq!(snap.detections, signals.detections);
    }
}
