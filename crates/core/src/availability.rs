//! Snapshot types produced by one poll of the availability source.

use std::collections::BTreeSet;

use crate::date::TicketDate;

/// Dates found available during one tick. Sorted and deduplicated by construction.
pub type AvailabilitySnapshot = BTreeSet<TicketDate>;

/// Outcome of acquiring a snapshot.
///
/// A failed acquisition is folded into the loop exactly like an empty
/// snapshot, but the variant keeps the reason around for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityResult {
    /// The source answered; the set may be empty.
    Found(AvailabilitySnapshot),
    /// The source failed, timed out, or panicked.
    SourceUnavailable { reason: String },
}

impl AvailabilityResult {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }

    /// The snapshot to fold into state: the found set, or empty on failure.
    pub fn into_snapshot(self) -> AvailabilitySnapshot {
        match self {
            Self::Found(dates) => dates,
            Self::SourceUnavailable { .. } => AvailabilitySnapshot::new(),
        }
    }
}

/// Render a set of dates as `a, b, c` in calendar order.
pub fn join_dates(dates: &AvailabilitySnapshot) -> String {
    dates
        .iter()
        .map(TicketDate::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
