//! Driveguard Fusion - temporal fusion for driver fatigue monitoring.
//!
//! This library turns a stream of noisy per-frame detector signals into a
//! stable, human-meaningful fatigue classification with anti-flicker
//! guarantees and exactly-once alerting per High episode.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Driveguard Fusion                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐            │
//! │  │ Aggregator │──▶│ Classifier │──▶│ Hysteresis │            │
//! │  │ (5f ticks) │   │   (port)   │   │ (debounce) │            │
//! │  └────────────┘   └────────────┘   └────────────┘            │
//! │        │                                  │                  │
//! │        ▼                                  ▼                  │
//! │  ┌────────────┐                   ┌────────────┐             │
//! │  │  Feature   │                   │   State    │──▶ episodes │
//! │  │  Windows   │                   │  Machine   │    (queue)  │
//! │  └────────────┘                   └────────────┘             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-frame cues are counted into a tick every 5th frame; ticks feed three
//! sliding windows whose contents go to the injected classifiers. Raw labels
//! are debounced through four asymmetric confirm counters, and the resulting
//! displayed level drives a small state machine that emits at most one
//! `FatigueEpisode` per contiguous High interval through a bounded queue.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use driveguard_fusion::{
//!     classifier::HeuristicClassifier,
//!     config::EngineConfig,
//!     events::{EpisodeDispatcher, LogSink},
//!     registry::SessionRegistry,
//!     signal::FrameSignals,
//!     stats::EngineStats,
//! };
//!
//! let config = EngineConfig::default();
//! let stats = Arc::new(EngineStats::new());
//! let dispatcher = EpisodeDispatcher::new(
//!     Arc::new(LogSink),
//!     config.episode_queue_capacity,
//!     stats.clone(),
//! );
//! let registry = SessionRegistry::new(
//!     config,
//!     Arc::new(HeuristicClassifier::default()),
//!     dispatcher.sender(),
//!     stats,
//! );
//!
//! let snapshot = registry
//!     .ingest("driver-1", &FrameSignals::cues(true, false))
//!     .unwrap();
//! println!("{:?}", snapshot.fatigue_level);
//! ```

pub mod classifier;
pub mod config;
pub mod core;
pub mod events;
pub mod registry;
pub mod signal;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use classifier::{ClassifierError, ClassifierPort, HeuristicClassifier};
pub use config::{EngineConfig, HysteresisConfig};
pub use core::{FatigueLevel, FatigueState, Session, Snapshot};
pub use events::{EpisodeDispatcher, EpisodeSender, EventSink, FatigueEpisode, JsonlSink};
pub use registry::SessionRegistry;
pub use signal::{Detection, FrameSignals, SignalError};
pub use stats::{EngineStats, SharedStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
