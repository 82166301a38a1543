//! Change detection between consecutive snapshots.

use crate::availability::AvailabilitySnapshot;

/// Dates present in `current` but absent from `previous`.
///
/// Only transitions across a single tick boundary are visible: a date that
/// disappears and reappears between two other ticks is reported again on
/// reappearance, but a date held across both ticks never is.
pub fn newly_available(
    current: &AvailabilitySnapshot,
    previous: &AvailabilitySnapshot,
) -> AvailabilitySnapshot {
    current.difference(previous).cloned().collect()
}
