//! Fatigue state tracking and episode gating.
//!
//! The state machine follows the displayed fatigue level and timestamps every
//! transition. It also owns the one-shot episode flag: at most one alert per
//! contiguous High interval, re-armed only when the state leaves High.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Classifier output domain for the fatigue model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatigueLevel {
    Low,
    Medium,
    High,
}

impl FatigueLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueLevel::Low => "Low",
            FatigueLevel::Medium => "Medium",
            FatigueLevel::High => "High",
        }
    }
}

/// Tracked session state: the displayed level, plus the pre-ready phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatigueState {
    Initializing,
    Low,
    Medium,
    High,
}

impl FatigueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueState::Initializing => "Initializing",
            FatigueState::Low => "Low",
            FatigueState::Medium => "Medium",
            FatigueState::High => "High",
        }
    }
}

impl From<FatigueLevel> for FatigueState {
    fn from(level: FatigueLevel) -> Self {
        match level {
            FatigueLevel::Low => FatigueState::Low,
            FatigueLevel::Medium => FatigueState::Medium,
            FatigueLevel::High => FatigueState::High,
        }
    }
}

/// Tracks the current state, its entry time, and the episode flag.
#[derive(Debug)]
pub struct FatigueStateMachine {
    state: FatigueState,
    entered_at: Instant,
    episode_logged: bool,
}

impl FatigueStateMachine {
    pub fn new() -> Self {
        Self {
            state: FatigueState::Initializing,
            entered_at: Instant::now(),
            episode_logged: false,
        }
    }

    /// Current tracked state.
    pub fn state(&self) -> FatigueState {
        self.state
    }

    /// Seconds spent in the current state.
    pub fn state_duration_secs(&self) -> f64 {
        self.entered_at.elapsed().as_secs_f64()
    }

    /// Whether an episode has already been emitted for the current High run.
    pub fn episode_logged(&self) -> bool {
        self.episode_logged
    }

    /// Mark the current High run as alerted.
    pub fn mark_episode_logged(&mut self) {
        self.episode_logged = true;
    }

    /// Drive the machine with the displayed level for this tick.
    ///
    /// Leaving High re-arms the episode flag so the next High run can alert
    /// again. Returns true if a transition occurred.
    pub fn observe(&mut self, level: FatigueLevel) -> bool {
        let next = FatigueState::from(level);
        if next == self.state {
            return false;
        }

        if self.state == FatigueState::High {
            tracing::debug!("left High state, episode flag re-armed");
            self.episode_logged = false;
        }

        let duration = self.entered_at.elapsed();
        tracing::info!(
            from = self.state.as_str(),
            to = next.as_str(),
            duration_secs = duration.as_secs_f64(),
            "fatigue state transition"
        );

        self.state = next;
        self.entered_at = Instant::now();
        true
    }
}

impl Default for FatigueStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
