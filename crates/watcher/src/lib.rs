//! Ticket availability watcher.
//!
//! This crate provides:
//! - `WatchConfig`, loaded from YAML with environment overrides
//! - `AvailabilitySource` and the calendar page scraper behind it
//! - `PollLoop`, which ties detection, gating, dispatch and heartbeats together

pub mod calendar;
pub mod config;
pub mod poll_loop;
pub mod source;

pub use calendar::{CalendarMarkup, CalendarPageSource};
pub use config::{ConfigError, WatchConfig};
pub use poll_loop::{LoopPhase, LoopSettings, PollLoop, TickReport};
pub use source::{acquire_snapshot, AvailabilitySource, SourceError};
