//! Configuration for the fusion engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Tunable parameters for the temporal-fusion engine.
///
/// The defaults reproduce the production behavior: a tick every 5 frames,
/// window lags of 200/6/10 ticks, and the asymmetric confirmation table.
/// Tests shrink the lags to shorten the warm-up phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of frames accumulated per tick
    pub frames_per_tick: u32,

    /// Fatigue window lag in ticks (the combined window holds 2x this)
    pub fatigue_lag: usize,

    /// Eye-closure window lag in ticks
    pub eye_lag: usize,

    /// Yawn window lag in ticks
    pub yawn_lag: usize,

    /// Debounce counter parameters
    pub hysteresis: HysteresisConfig,

    /// Capacity of the bounded episode dispatch queue
    pub episode_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frames_per_tick: 5,
            fatigue_lag: 200,
            eye_lag: 6,
            yawn_lag: 10,
            hysteresis: HysteresisConfig::default(),
            episode_queue_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EngineConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("driveguard-fusion")
            .join("config.json")
    }

    /// Capacity of the combined fatigue window (two samples per tick).
    pub fn combined_capacity(&self) -> usize {
        self.fatigue_lag * 2
    }
}

/// Confirm counter parameters: increment is always +1 per confirming tick;
/// decay and threshold are per-counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HysteresisConfig {
    /// Ticks of confirmed High before the displayed level escalates
    pub high_confirm_threshold: u32,

    /// Counter decay per non-High tick (steep: one tick undoes 20 of climb)
    pub high_decay: u32,

    /// Ticks of raw eye closure before it is displayed
    pub eye_confirm_threshold: u32,

    /// Ticks of raw yawn before it is displayed
    pub yawn_confirm_threshold: u32,

    /// Consecutive raw-Low ticks that trigger the soft reset
    pub low_reset_threshold: u32,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            high_confirm_threshold: 40,
            high_decay: 20,
            eye_confirm_threshold: 3,
            yawn_confirm_threshold: 3,
            low_reset_threshold: 10,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
