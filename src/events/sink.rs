//! Episode delivery targets.

use crate::events::FatigueEpisode;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Destination for confirmed fatigue episodes.
///
/// Delivery is at-most-once and best-effort: failures are logged by the
/// dispatch worker and never retried or surfaced to the ingestion path.
pub trait EventSink: Send + Sync {
    fn record(&self, episode: &FatigueEpisode) -> Result<(), SinkError>;
}

/// Sink delivery errors.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Appends one JSON line per episode to a file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl EventSink for JsonlSink {
    fn record(&self, episode: &FatigueEpisode) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(episode)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        Ok(())
    }
}

/// Emits episodes to the tracing log only. Used when no storage is wired up.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, episode: &FatigueEpisode) -> Result<(), SinkError> {
        tracing::info!(
            subject = %episode.subject,
            level = episode.level.as_str(),
            at = %episode.at,
            id = %episode.id,
            "fatigue episode"
        );
        Ok(())
    }
}
