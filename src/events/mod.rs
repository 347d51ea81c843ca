//! Fatigue episode emission.
//!
//! A `FatigueEpisode` marks the start of one contiguous High interval. The
//! hot ingestion path never talks to storage directly: episodes go through a
//! bounded queue drained by a dedicated worker, so a slow or failing sink can
//! never stall frame processing.

pub mod dispatcher;
pub mod sink;

pub use dispatcher::{EpisodeDispatcher, EpisodeSender};
pub use sink::{EventSink, JsonlSink, LogSink, SinkError};

use crate::core::state::FatigueLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One alert-worthy fatigue interval; at most one per contiguous High run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueEpisode {
    /// Unique episode identifier
    pub id: Uuid,
    /// Subject the episode belongs to
    pub subject: String,
    /// Confirmed level (always High today; kept for forward compatibility)
    pub level: FatigueLevel,
    /// When the episode was confirmed
    pub at: DateTime<Utc>,
}

impl FatigueEpisode {
    /// Create a High episode for the given subject, timestamped now.
    pub fn high(subject: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            level: FatigueLevel::High,
            at: Utc::now(),
        }
    }
}
