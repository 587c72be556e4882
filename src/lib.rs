//! Multi-instance stopwatch engine: independent timers with laps, each
//! refreshed by its own ticker thread, published as immutable snapshots.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod trigger;
pub mod ui;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{Snapshot, Subscription, TimerEngine};
pub use error::ConfigError;
pub use timer_core::{format_elapsed, Lap, Stopwatch};
pub use trigger::TriggerIntent;
