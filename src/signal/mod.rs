//! Detector-facing signal types for the fusion engine.

pub mod types;

pub use types::{Detection, FrameSignals, SignalError};
