//! Fixed-capacity sliding feature windows.
//!
//! Classifiers consume a bounded history of per-tick counts. The window is a
//! ring buffer with two operations: slide-append (drops the oldest sample once
//! at capacity) and zero-fill-in-place (overwrites every sample with 0.0 while
//! preserving length, so readiness is unaffected).

use std::collections::VecDeque;

/// A bounded sliding buffer of numeric samples.
///
/// Invariant: `len() <= capacity()` at all times.
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl FeatureWindow {
    /// Create an empty window with the given fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest one if the window is full.
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Overwrite every stored sample with 0.0, keeping the current length.
    pub fn zero_fill(&mut self) {
        for sample in self.samples.iter_mut() {
            *sample = 0.0;
        }
    }

    /// Current number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the window has reached its fixed capacity.
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// The fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The stored samples as one contiguous slice, oldest first.
    pub fn samples(&mut self) -> &[f64] {
        self.samples.make_contiguous()
    }

    /// Iterate over stored samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}
