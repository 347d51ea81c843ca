//! Per-frame detector signal types.
//!
//! These are produced upstream by the object-detection stage. The fusion
//! engine only consumes the two boolean cues and passes detection boxes
//! through to the caller untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One detection box reported by the upstream detector.
///
/// Opaque to the fusion core: carried through to the snapshot unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector class label (e.g. "closed_eye", "open_mouth")
    pub class: String,
    /// Detection confidence (0-1)
    pub confidence: f64,
    /// Bounding box as `[x, y, width, height]` in pixels
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
}

/// Signals extracted from a single camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSignals {
    /// Whether a closed eye was detected in this frame
    pub eye_closed_detected: bool,
    /// Whether an open mouth was detected in this frame
    pub mouth_open_detected: bool,
    /// Detection boxes, passed through to the snapshot
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl FrameSignals {
    /// Build signals from the two boolean cues with no detection boxes.
    pub fn cues(eye_closed_detected: bool, mouth_open_detected: bool) -> Self {
        Self {
            eye_closed_detected,
            mouth_open_detected,
            detections: Vec::new(),
        }
    }

    /// Validate the frame before any engine state is touched.
    ///
    /// A rejected frame must leave accumulators unmodified, so this runs
    /// first on the ingestion path.
    pub fn validate(&self) -> Result<(), SignalError> {
        for detection in &self.detections {
            if !detection.confidence.is_finite() {
                return Err(SignalError::NonFiniteConfidence {
                    class: detection.class.clone(),
                });
            }
            if !(0.0..=1.0).contains(&detection.confidence) {
                return Err(SignalError::ConfidenceOutOfRange {
                    class: detection.class.clone(),
                    confidence: detection.confidence,
                });
            }
        }
        Ok(())
    }
}

/// Malformed per-frame input.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("non-finite confidence for detection class '{class}'")]
    NonFiniteConfidence { class: String },

    #[error("confidence {confidence} out of range for detection class '{class}'")]
    ConfidenceOutOfRange { class: String, confidence: f64 },
}
