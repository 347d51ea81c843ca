//! Per-frame signal aggregation into periodic window updates.
//!
//! Raw boolean cues are counted over `frames_per_tick` frames. On every tick
//! the counts are appended to the three feature windows and the accumulators
//! reset. `ready` latches true, irreversibly, on the first tick at which all
//! three windows reach capacity; ticks before that produce no classification.

use crate::config::EngineConfig;
use crate::core::window::FeatureWindow;

/// Outcome of pushing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was accumulated but no tick boundary was crossed.
    Accumulated,
    /// A tick completed while the windows are still filling.
    TickWarming,
    /// The tick at which all windows first reached capacity.
    TickBecameReady,
    /// A tick completed with the windows ready for classification.
    TickReady,
}

impl FrameOutcome {
    /// Whether this frame crossed a tick boundary.
    pub fn is_tick(&self) -> bool {
        !matches!(self, FrameOutcome::Accumulated)
    }
}

/// Batches per-frame cues into the three sliding windows.
#[derive(Debug)]
pub struct WindowAggregator {
    frames_per_tick: u32,
    frame_counter: u64,
    eye_closed_count: u32,
    mouth_open_count: u32,
    combined: FeatureWindow,
    eye: FeatureWindow,
    yawn: FeatureWindow,
    ready: bool,
}

impl WindowAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            frames_per_tick: config.frames_per_tick.max(1),
            frame_counter: 0,
            eye_closed_count: 0,
            mouth_open_count: 0,
            combined: FeatureWindow::new(config.combined_capacity()),
            eye: FeatureWindow::new(config.eye_lag),
            yawn: FeatureWindow::new(config.yawn_lag),
            ready: false,
        }
    }

    /// Accumulate one frame's cues; on a tick boundary, update the windows.
    pub fn push_frame(&mut self, eye_closed: bool, mouth_open: bool) -> FrameOutcome {
        if eye_closed {
            self.eye_closed_count += 1;
        }
        if mouth_open {
            self.mouth_open_count += 1;
        }
        self.frame_counter += 1;

        if self.frame_counter % u64::from(self.frames_per_tick) != 0 {
            return FrameOutcome::Accumulated;
        }

        let eye_count = f64::from(self.eye_closed_count);
        let mouth_count = f64::from(self.mouth_open_count);
        self.eye_closed_count = 0;
        self.mouth_open_count = 0;

        // Combined window takes both counts as two scalar samples.
        self.combined.push(eye_count);
        self.combined.push(mouth_count);
        self.eye.push(eye_count);
        self.yawn.push(mouth_count);

        if self.ready {
            return FrameOutcome::TickReady;
        }

        if self.combined.is_full() && self.eye.is_full() && self.yawn.is_full() {
            // One-way latch: never reverts, even across the soft reset.
            self.ready = true;
            tracing::info!(
                tick = self.tick_counter(),
                "all windows at capacity, engine ready"
            );
            return FrameOutcome::TickBecameReady;
        }

        FrameOutcome::TickWarming
    }

    /// Whether the warm-up phase has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Total frames accumulated so far.
    pub fn frames_seen(&self) -> u64 {
        self.frame_counter
    }

    /// Ticks completed so far.
    pub fn tick_counter(&self) -> u64 {
        self.frame_counter / u64::from(self.frames_per_tick)
    }

    /// Zero-fill all three windows in place, preserving their lengths.
    pub fn zero_fill_all(&mut self) {
        self.combined.zero_fill();
        self.eye.zero_fill();
        self.yawn.zero_fill();
    }

    pub fn combined(&self) -> &FeatureWindow {
        &self.combined
    }

    pub fn eye(&self) -> &FeatureWindow {
        &self.eye
    }

    pub fn yawn(&self) -> &FeatureWindow {
        &self.yawn
    }

    pub(crate) fn combined_mut(&mut self) -> &mut FeatureWindow {
        &mut self.combined
    }

    pub(crate) fn eye_mut(&mut self) -> &mut FeatureWindow {
        &mut self.eye
    }

    pub(crate) fn yawn_mut(&mut self) -> &mut FeatureWindow {
        &mut self.yawn
    }
}
