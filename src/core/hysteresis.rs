//! Debounce counters turning noisy per-tick labels into stable displayed ones.
//!
//! Four clamped-at-zero counters with asymmetric increment/decay. The fatigue
//! counter climbs +1 per confirming tick but decays 20 per non-High tick, so
//! escalation needs 40 sustained ticks while a single contrary tick is enough
//! to demote. The low-confirm counter resets on any non-Low tick and, once it
//! reaches its threshold, triggers a full soft reset of windows and counters.

use crate::config::HysteresisConfig;
use crate::core::state::FatigueLevel;
use serde::Serialize;

/// Raw per-tick labels from the classifier port, before debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLabels {
    pub fatigue: FatigueLevel,
    pub eye_closure: bool,
    pub yawn: bool,
}

/// Debounced, user-facing labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayedLabels {
    pub fatigue: FatigueLevel,
    pub eye_closure: bool,
    pub yawn: bool,
}

impl Default for DisplayedLabels {
    fn default() -> Self {
        Self {
            fatigue: FatigueLevel::Low,
            eye_closure: false,
            yawn: false,
        }
    }
}

/// Result of applying one tick's raw labels.
#[derive(Debug, Clone, Copy)]
pub struct TickUpdate {
    /// Labels recomputed for this tick, before any low-confirm reset. Episode
    /// gating reads these: an alert fires even if the same tick then resets.
    pub displayed: DisplayedLabels,
    /// The low-confirm threshold was reached; counters were zeroed and the
    /// caller must zero-fill the windows in place.
    pub soft_reset: bool,
}

/// Integer accumulator clamped at a floor of zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmCounter {
    value: u32,
}

impl ConfirmCounter {
    /// Increment on a confirming tick, otherwise decay toward the floor.
    fn observe(&mut self, hit: bool, decay: u32) {
        if hit {
            self.value += 1;
        } else {
            self.value = self.value.saturating_sub(decay);
        }
    }

    /// Increment on a confirming tick, otherwise reset to zero.
    fn observe_or_reset(&mut self, hit: bool) {
        if hit {
            self.value += 1;
        } else {
            self.value = 0;
        }
    }

    fn reset(&mut self) {
        self.value = 0;
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn confirmed(&self, threshold: u32) -> bool {
        self.value >= threshold
    }
}

/// Counter values at a point in time, for observability and tests.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CounterSnapshot {
    pub high_fatigue: u32,
    pub eye_closure: u32,
    pub yawn: u32,
    pub low_confirm: u32,
}

/// The four-counter debounce stage.
#[derive(Debug)]
pub struct HysteresisEngine {
    config: HysteresisConfig,
    high_fatigue: ConfirmCounter,
    eye_closure: ConfirmCounter,
    yawn: ConfirmCounter,
    low_confirm: ConfirmCounter,
    displayed: DisplayedLabels,
}

impl HysteresisEngine {
    pub fn new(config: HysteresisConfig) -> Self {
        Self {
            config,
            high_fatigue: ConfirmCounter::default(),
            eye_closure: ConfirmCounter::default(),
            yawn: ConfirmCounter::default(),
            low_confirm: ConfirmCounter::default(),
            displayed: DisplayedLabels::default(),
        }
    }

    /// Apply one tick's raw labels.
    ///
    /// Recompute order: fatigue counter and displayed level, then eye, then
    /// yawn, then the low-confirm reset check. On a soft reset the stored
    /// displayed labels are forced back to baseline, but the returned
    /// `TickUpdate.displayed` keeps the pre-reset values for episode gating.
    pub fn apply(&mut self, raw: RawLabels) -> TickUpdate {
        self.high_fatigue.observe(
            raw.fatigue == FatigueLevel::High,
            self.config.high_decay,
        );

        let displayed_fatigue = if self
            .high_fatigue
            .confirmed(self.config.high_confirm_threshold)
        {
            FatigueLevel::High
        } else if raw.fatigue == FatigueLevel::Medium {
            FatigueLevel::Medium
        } else {
            FatigueLevel::Low
        };

        self.eye_closure.observe(raw.eye_closure, 1);
        let displayed_eye = self
            .eye_closure
            .confirmed(self.config.eye_confirm_threshold);

        self.yawn.observe(raw.yawn, 1);
        let displayed_yawn = self.yawn.confirmed(self.config.yawn_confirm_threshold);

        self.displayed = DisplayedLabels {
            fatigue: displayed_fatigue,
            eye_closure: displayed_eye,
            yawn: displayed_yawn,
        };
        let pre_reset = self.displayed;

        self.low_confirm
            .observe_or_reset(raw.fatigue == FatigueLevel::Low);
        let soft_reset = self
            .low_confirm
            .confirmed(self.config.low_reset_threshold);

        if soft_reset {
            tracing::info!("state confirmed Low, soft-resetting counters and windows");
            self.reset_counters();
            self.displayed = DisplayedLabels::default();
        }

        TickUpdate {
            displayed: pre_reset,
            soft_reset,
        }
    }

    /// Zero all four counters.
    pub fn reset_counters(&mut self) {
        self.high_fatigue.reset();
        self.eye_closure.reset();
        self.yawn.reset();
        self.low_confirm.reset();
    }

    /// The debounced labels after the most recent tick.
    pub fn displayed(&self) -> DisplayedLabels {
        self.displayed
    }

    /// Current counter values.
    pub fn counters(&self) -> CounterSnapshot {
        CounterSnapshot {
            high_fatigue: self.high_fatigue.value(),
            eye_closure: self.eye_closure.value(),
            yawn: self.yawn.value(),
            low_confirm: self.low_confirm.value(),
        }
    }
}
