//! Temporal-fusion core: windows, aggregation, hysteresis, state tracking.

pub mod aggregator;
pub mod hysteresis;
pub mod session;
pub mod state;
pub mod window;

pub use aggregator::{FrameOutcome, WindowAggregator};
pub use hysteresis::{CounterSnapshot, DisplayedLabels, HysteresisEngine, RawLabels, TickUpdate};
pub use session::{Session, Snapshot};
pub use state::{FatigueLevel, FatigueState, FatigueStateMachine};
pub use window::FeatureWindow;
