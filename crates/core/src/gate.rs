//! Notification gate: decides whether a detected change may be dispatched.
//!
//! The gate is keyed on a single global timestamp, not per date. A date that
//! becomes available while the cool-down is running is dropped for that tick
//! and, if it stays available, is never reported.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::availability::AvailabilitySnapshot;
use crate::state::{elapsed_at_least, remaining, NotifierState};

/// Outcome of running the gate for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing newly available.
    NoChange,
    /// New dates exist but the minimum interval has not elapsed.
    RateLimited {
        suppressed: AvailabilitySnapshot,
        retry_in: Duration,
    },
    /// Dispatch exactly these dates.
    Dispatch(AvailabilitySnapshot),
}

impl GateDecision {
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}

/// Gate `newly_available` against the last successful notification.
///
/// Never mutates state: timestamps move only after a successful dispatch,
/// and the snapshot is replaced by the caller regardless of the decision.
pub fn evaluate(
    newly_available: AvailabilitySnapshot,
    state: &NotifierState,
    now: DateTime<Utc>,
) -> GateDecision {
    if newly_available.is_empty() {
        return GateDecision::NoChange;
    }

    if !elapsed_at_least(
        now,
        state.last_notification_at,
        state.min_notification_interval,
    ) {
        let retry_in = remaining(
            now,
            state.last_notification_at,
            state.min_notification_interval,
        );
        return GateDecision::RateLimited {
            suppressed: newly_available,
            retry_in,
        };
    }

    GateDecision::Dispatch(newly_available)
}
