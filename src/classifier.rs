//! Classifier port: the boundary to the inference subsystem.
//!
//! The engine calls three synchronous, deterministic functions once per ready
//! tick with the current window contents. Implementations are injected as
//! immutable dependencies at session construction; the engine never inspects
//! model internals and treats failures as a degraded tick, not a fatal error.

use crate::core::state::FatigueLevel;
use thiserror::Error;

/// The three window classifiers supplied by the inference subsystem.
pub trait ClassifierPort: Send + Sync {
    /// Three-level fatigue label from the combined window (2x fatigue lag).
    fn fatigue(&self, window: &[f64]) -> Result<FatigueLevel, ClassifierError>;

    /// Sustained eye closure from the eye window.
    fn eye_closure(&self, window: &[f64]) -> Result<bool, ClassifierError>;

    /// Yawning from the yawn window.
    fn yawn(&self, window: &[f64]) -> Result<bool, ClassifierError>;
}

/// Classifier invocation errors.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("inference backend failed: {0}")]
    Backend(String),

    #[error("window length {got} does not match expected {expected}")]
    WindowLength { expected: usize, got: usize },
}

/// Built-in mean-threshold classifier.
///
/// Stands in for the trained models so the binary and simulations run without
/// an inference runtime. Window samples are per-tick detection counts in
/// `0..=frames_per_tick`; the mean over the window is compared against fixed
/// thresholds. Real deployments inject their own `ClassifierPort`.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    /// Mean combined count at or above which the label is Medium
    pub medium_threshold: f64,
    /// Mean combined count at or above which the label is High
    pub high_threshold: f64,
    /// Mean eye-closure count at or above which the eye label is true
    pub eye_threshold: f64,
    /// Mean mouth-open count at or above which the yawn label is true
    pub yawn_threshold: f64,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self {
            medium_threshold: 1.5,
            high_threshold: 3.0,
            eye_threshold: 2.5,
            yawn_threshold: 2.5,
        }
    }
}

fn mean(window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

impl ClassifierPort for HeuristicClassifier {
    fn fatigue(&self, window: &[f64]) -> Result<FatigueLevel, ClassifierError> {
        let m = mean(window);
        if m >= self.high_threshold {
            Ok(FatigueLevel::High)
        } else if m >= self.medium_threshold {
            Ok(FatigueLevel::Medium)
        } else {
            Ok(FatigueLevel::Low)
        }
    }

    fn eye_closure(&self, window: &[f64]) -> Result<bool, ClassifierError> {
        Ok(mean(window) >= self.eye_threshold)
    }

    fn yawn(&self, window: &[f64]) -> Result<bool, ClassifierError> {
        Ok(mean(window) >= self.yawn_threshold)
    }
}
