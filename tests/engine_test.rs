//! End-to-end tests for the fusion engine: warm-up, hysteresis, episode
//! gating, soft reset, and session independence.

use driveguard_fusion::classifier::{ClassifierError, ClassifierPort};
use driveguard_fusion::config::EngineConfig;
use driveguard_fusion::core::{FatigueLevel, FatigueState, Session, Snapshot};
use driveguard_fusion::events::{EpisodeSender, FatigueEpisode};
use driveguard_fusion::registry::SessionRegistry;
use driveguard_fusion::signal::FrameSignals;
use driveguard_fusion::stats::EngineStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Classifier returning whatever the test scripted.
struct ScriptedClassifier {
    fatigue: Mutex<FatigueLevel>,
    eye: AtomicBool,
    yawn: AtomicBool,
}

impl ScriptedClassifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fatigue: Mutex::new(FatigueLevel::Low),
            eye: AtomicBool::new(false),
            yawn: AtomicBool::new(false),
        })
    }

    fn set_fatigue(&self, level: FatigueLevel) {
        *self.fatigue.lock().unwrap() = level;
    }

    fn set_eye(&self, closed: bool) {
        self.eye.store(closed, Ordering::SeqCst);
    }
}

impl ClassifierPort for ScriptedClassifier {
    fn fatigue(&self, _window: &[f64]) -> Result<FatigueLevel, ClassifierError> {
        Ok(*self.fatigue.lock().unwrap())
    }

    fn eye_closure(&self, _window: &[f64]) -> Result<bool, ClassifierError> {
        Ok(self.eye.load(Ordering::SeqCst))
    }

    fn yawn(&self, _window: &[f64]) -> Result<bool, ClassifierError> {
        Ok(self.yawn.load(Ordering::SeqCst))
    }
}

/// Lags 2/2/2: every window fills by tick 2, classification starts at tick 3.
fn small_config() -> EngineConfig {
    EngineConfig {
        fatigue_lag: 2,
        eye_lag: 2,
        yawn_lag: 2,
        ..EngineConfig::default()
    }
}

fn session_with(
    config: EngineConfig,
    classifier: Arc<ScriptedClassifier>,
) -> (Session, crossbeam_channel::Receiver<FatigueEpisode>) {
    let stats = Arc::new(EngineStats::new());
    let (episodes, rx) = EpisodeSender::bounded(64, stats.clone());
    let session = Session::new("subject".to_string(), config, classifier, episodes, stats);
    (session, rx)
}

/// Feed one full tick (5 frames) of identical signals.
fn run_tick(session: &mut Session, signals: &FrameSignals) -> Snapshot {
    let mut last = None;
    for _ in 0..5 {
        last = Some(session.ingest(signals).unwrap());
    }
    last.unwrap()
}

/// Warm up a lags-2/2/2 session: two ticks, the second latching ready.
fn warm_up(session: &mut Session) {
    let signals = FrameSignals::cues(false, false);
    run_tick(session, &signals);
    let snap = run_tick(session, &signals);
    assert!(snap.ready);
    assert_eq!(snap.fatigue_level, FatigueState::Low);
}

#[test]
fn high_confirms_on_exactly_the_fortieth_tick() {
    let classifier = ScriptedClassifier::new();
    let (mut session, _rx) = session_with(small_config(), classifier.clone());
    warm_up(&mut session);

    classifier.set_fatigue(FatigueLevel::High);
    let signals = FrameSignals::cues(true, false);

    for tick in 1..=40 {
        let snap = run_tick(&mut session, &signals);
        assert_eq!(session.hysteresis().counters().high_fatigue, tick);
        if tick < 40 {
            assert_ne!(
                snap.fatigue_level,
                FatigueState::High,
                "displayed High before the 40th confirming tick"
            );
        } else {
            assert_eq!(snap.fatigue_level, FatigueState::High);
        }
    }
}

#[test]
fn single_non_high_tick_demotes_after_confirmation() {
    let classifier = ScriptedClassifier::new();
    let (mut session, _rx) = session_with(small_config(), classifier.clone());
    warm_up(&mut session);

    classifier.set_fatigue(FatigueLevel::High);
    let signals = FrameSignals::cues(true, false);
    for _ in 0..40 {
        run_tick(&mut session, &signals);
    }
    assert_eq!(session.hysteresis().counters().high_fatigue, 40);

    classifier.set_fatigue(FatigueLevel::Low);
    let snap = run_tick(&mut session, &signals);

    assert_eq!(session.hysteresis().counters().high_fatigue, 20);
    assert_eq!(snap.fatigue_level, FatigueState::Low);
}

#[test]
fn one_episode_per_contiguous_high_interval() {
    let classifier = ScriptedClassifier::new();
    let (mut session, rx) = session_with(small_config(), classifier.clone());
    warm_up(&mut session);

    let signals = FrameSignals::cues(true, false);

    // First High interval: confirmation on tick 40, held for 20 more ticks.
    classifier.set_fatigue(FatigueLevel::High);
    for _ in 0..60 {
        run_tick(&mut session, &signals);
    }
    assert_eq!(rx.try_iter().count(), 1);

    // Leave High: counter 60 drops to 40... one tick is not enough here, so
    // feed Low until the displayed level actually demotes.
    classifier.set_fatigue(FatigueLevel::Low);
    let mut snap = run_tick(&mut session, &signals);
    while snap.fatigue_level == FatigueState::High {
        snap = run_tick(&mut session, &signals);
    }
    assert_eq!(rx.try_iter().count(), 0);

    // Re-enter High: a new episode once re-confirmed.
    classifier.set_fatigue(FatigueLevel::High);
    for _ in 0..40 {
        run_tick(&mut session, &signals);
    }
    let episodes: Vec<_> = rx.try_iter().collect();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].subject, "subject");
    assert_eq!(episodes[0].level, FatigueLevel::High);
}

#[test]
fn minimum_length_high_interval_still_alerts_once() {
    let classifier = ScriptedClassifier::new();
    let (mut session, rx) = session_with(small_config(), classifier.clone());
    warm_up(&mut session);

    let signals = FrameSignals::cues(true, false);

    // Exactly 40 High ticks then straight back to Low: a one-tick displayed
    // High interval.
    classifier.set_fatigue(FatigueLevel::High);
    for _ in 0..40 {
        run_tick(&mut session, &signals);
    }
    classifier.set_fatigue(FatigueLevel::Low);
    let snap = run_tick(&mut session, &signals);
    assert_ne!(snap.fatigue_level, FatigueState::High);

    assert_eq!(rx.try_iter().count(), 1);
}

#[test]
fn low_confirm_soft_reset_zero_fills_but_keeps_ready() {
    let classifier = ScriptedClassifier::new();
    let (mut session, _rx) = session_with(small_config(), classifier.clone());
    warm_up(&mut session);

    // Put real data in the windows and some counter state.
    classifier.set_fatigue(FatigueLevel::Medium);
    classifier.set_eye(true);
    let busy = FrameSignals::cues(true, true);
    for _ in 0..5 {
        run_tick(&mut session, &busy);
    }
    assert!(session.aggregator().combined().iter().any(|s| s != 0.0));
    assert!(session.hysteresis().counters().eye_closure > 0);

    // Ten consecutive raw-Low ticks trigger the reset.
    classifier.set_fatigue(FatigueLevel::Low);
    classifier.set_eye(false);
    for _ in 0..10 {
        run_tick(&mut session, &busy);
    }

    let agg = session.aggregator();
    assert!(agg.is_ready(), "ready must survive the soft reset");
    assert!(agg.combined().is_full(), "lengths must be preserved");
    assert!(agg.eye().is_full());
    assert!(agg.yawn().is_full());
    assert!(agg.combined().iter().all(|s| s == 0.0));
    assert!(agg.eye().iter().all(|s| s == 0.0));
    assert!(agg.yawn().iter().all(|s| s == 0.0));

    let counters = session.hysteresis().counters();
    assert_eq!(counters.high_fatigue, 0);
    assert_eq!(counters.eye_closure, 0);
    assert_eq!(counters.yawn, 0);
    assert_eq!(counters.low_confirm, 0);

    let snap = session.snapshot();
    assert_eq!(snap.fatigue_level, FatigueState::Low);
    assert!(!snap.eye_closure);
    assert!(!snap.yawn_detected);
}

#[test]
fn window_lengths_and_counters_bounded_for_arbitrary_input() {
    let classifier = ScriptedClassifier::new();
    let (mut session, _rx) = session_with(small_config(), classifier.clone());

    // Deterministic but messy input pattern with label flips along the way.
    for frame in 0u64..1000 {
        if frame % 97 == 0 {
            classifier.set_fatigue(match frame % 3 {
                0 => FatigueLevel::High,
                1 => FatigueLevel::Medium,
                _ => FatigueLevel::Low,
            });
            classifier.set_eye(frame % 2 == 0);
        }

        let signals = FrameSignals::cues(frame % 3 == 0, frame % 7 == 0);
        session.ingest(&signals).unwrap();

        let agg = session.aggregator();
        assert!(agg.combined().len() <= agg.combined().capacity());
        assert!(agg.eye().len() <= agg.eye().capacity());
        assert!(agg.yawn().len() <= agg.yawn().capacity());
        // Counters are unsigned; confirm they stay sane rather than wrapping.
        assert!(session.hysteresis().counters().high_fatigue < 1000);
    }
}

#[test]
fn eye_closure_displays_on_the_ninth_tick() {
    // Combined window fills at tick 2, eye and yawn at tick 6: ready latches
    // on tick 6, classification starts at tick 7, and the always-true eye
    // classifier needs three ticks, so the displayed flag flips at tick 9
    // (frame 45) and not earlier.
    let config = EngineConfig {
        fatigue_lag: 2,
        eye_lag: 6,
        yawn_lag: 6,
        ..EngineConfig::default()
    };
    let classifier = ScriptedClassifier::new();
    classifier.set_eye(true);
    let (mut session, _rx) = session_with(config, classifier);

    let mut first_true_frame = None;
    for frame in 1u64..=200 {
        // Alternate the cue so every 5-frame tick counts at least one closure.
        let signals = FrameSignals::cues(frame % 2 == 1, false);
        let snap = session.ingest(&signals).unwrap();
        if snap.eye_closure && first_true_frame.is_none() {
            first_true_frame = Some(frame);
        }
        if frame == 44 {
            assert!(!snap.eye_closure, "displayed eye closure before tick 9");
        }
    }

    assert_eq!(first_true_frame, Some(45));
}

#[test]
fn interleaved_sessions_stay_independent() {
    let stats = Arc::new(EngineStats::new());
    let (episodes, _rx) = EpisodeSender::bounded(64, stats.clone());
    let classifier = ScriptedClassifier::new();
    classifier.set_fatigue(FatigueLevel::Medium);
    let registry = SessionRegistry::new(small_config(), classifier, episodes, stats);

    for frame in 0u64..300 {
        let signals = FrameSignals::cues(frame % 2 == 0, frame % 4 == 0);
        let a = registry.ingest("subject-a", &signals).unwrap();
        let b = registry.ingest("subject-b", &signals).unwrap();

        // Identical inputs produce identical observable state; durations are
        // wall-clock and excluded.
        assert_eq!(a.fatigue_level, b.fatigue_level);
        assert_eq!(a.eye_closure, b.eye_closure);
        assert_eq!(a.yawn_detected, b.yawn_detected);
        assert_eq!(a.ready, b.ready);
    }

    // Mutating one leaves the other untouched.
    registry.reset("subject-a");
    let signals = FrameSignals::cues(false, false);
    let a = registry.ingest("subject-a", &signals).unwrap();
    let b = registry.ingest("subject-b", &signals).unwrap();
    assert_eq!(a.fatigue_level, FatigueState::Initializing);
    assert!(!a.ready);
    assert!(b.ready);
}

#[test]
fn registry_reset_matches_fresh_session() {
    let stats = Arc::new(EngineStats::new());
    let (episodes, _rx) = EpisodeSender::bounded(64, stats.clone());
    let classifier = ScriptedClassifier::new();
    let registry = SessionRegistry::new(small_config(), classifier, episodes, stats);

    for frame in 0u64..100 {
        let signals = FrameSignals::cues(frame % 2 == 0, false);
        registry.ingest("driver", &signals).unwrap();
    }
    registry.reset("driver");

    let session = registry.session("driver");
    let session = session.lock().unwrap();
    assert!(!session.is_ready());
    assert_eq!(session.aggregator().frames_seen(), 0);
    assert!(session.aggregator().combined().is_empty());
    assert_eq!(session.snapshot().fatigue_level, FatigueState::Initializing);
}
