//! Heartbeat scheduling, independent of availability state.

use chrono::{DateTime, Utc};

use crate::state::{elapsed_at_least, NotifierState};

/// Whether a heartbeat should be sent at `now`.
///
/// Always `false` when the heartbeat interval is zero. Otherwise due when no
/// heartbeat has been delivered yet, or at least one interval has passed
/// since the last delivered one.
pub fn heartbeat_due(now: DateTime<Utc>, state: &NotifierState) -> bool {
    state.heartbeats_enabled()
        && elapsed_at_least(now, state.last_heartbeat_at, state.heartbeat_interval)
}
