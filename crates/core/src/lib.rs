//! Change-detection engine for ticket availability.
//!
//! This crate provides:
//! - `TicketDate` and snapshot types
//! - Change detection between consecutive snapshots
//! - `NotifierState`, the state carried across poll ticks
//! - The rate-limiting notification gate and heartbeat schedule
//!
//! Everything here is synchronous and free of I/O; callers pass `now`
//! explicitly so behavior is deterministic under test.

pub mod availability;
pub mod date;
pub mod detector;
pub mod gate;
pub mod heartbeat;
pub mod state;

pub use availability::{join_dates, AvailabilityResult, AvailabilitySnapshot};
pub use date::{DateError, TicketDate};
pub use detector::newly_available;
pub use gate::GateDecision;
pub use heartbeat::heartbeat_due;
pub use state::NotifierState;
