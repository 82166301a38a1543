//! Long-lived notifier state, owned and mutated only by the poll loop.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::availability::AvailabilitySnapshot;

/// Default minimum gap between two availability notifications.
pub const DEFAULT_MIN_NOTIFICATION_INTERVAL: Duration = Duration::from_secs(300);

/// Everything the engine remembers between ticks.
///
/// Fields are public so callers (and tests) can build any prior state
/// directly. Nothing here is persisted; a restart begins from
/// [`NotifierState::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierState {
    /// Snapshot from the immediately prior tick.
    pub previous_available: AvailabilitySnapshot,
    /// Last *successfully delivered* availability notification.
    pub last_notification_at: Option<DateTime<Utc>>,
    /// Last successfully delivered heartbeat.
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Minimum gap between availability notifications.
    pub min_notification_interval: Duration,
    /// Heartbeat cadence. Zero disables heartbeats.
    pub heartbeat_interval: Duration,
}

impl NotifierState {
    pub fn new(min_notification_interval: Duration, heartbeat_interval: Duration) -> Self {
        Self {
            previous_available: AvailabilitySnapshot::new(),
            last_notification_at: None,
            last_heartbeat_at: None,
            min_notification_interval,
            heartbeat_interval,
        }
    }

    /// Replace the remembered snapshot. Called every tick, dispatch or not.
    pub fn observe(&mut self, current: AvailabilitySnapshot) {
        self.previous_available = current;
    }

    pub fn record_notification_at(&mut self, at: DateTime<Utc>) {
        self.last_notification_at = Some(at);
    }

    pub fn record_heartbeat_at(&mut self, at: DateTime<Utc>) {
        self.last_heartbeat_at = Some(at);
    }

    pub fn heartbeats_enabled(&self) -> bool {
        !self.heartbeat_interval.is_zero()
    }
}

impl Default for NotifierState {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_NOTIFICATION_INTERVAL, Duration::ZERO)
    }
}

/// Whether at least `interval` has passed between `last` and `now`.
///
/// An unset `last` counts as infinitely long ago. A `last` in the future
/// (clock stepped backwards) counts as no time elapsed, so only a zero
/// interval is satisfied.
pub(crate) fn elapsed_at_least(
    now: DateTime<Utc>,
    last: Option<DateTime<Utc>>,
    interval: Duration,
) -> bool {
    let Some(last) = last else {
        return true;
    };
    if interval.is_zero() {
        return true;
    }
    let elapsed = now.signed_duration_since(last);
    match chrono::Duration::from_std(interval) {
        Ok(interval) => elapsed >= interval,
        // Interval beyond chrono's range: never reached.
        Err(_) => false,
    }
}

/// Time left until `interval` has passed since `last`, if any.
pub(crate) fn remaining(
    now: DateTime<Utc>,
    last: Option<DateTime<Utc>>,
    interval: Duration,
) -> Duration {
    let Some(last) = last else {
        return Duration::ZERO;
    };
    let elapsed = now
        .signed_duration_since(last)
        .to_std()
        .unwrap_or(Duration::ZERO);
    interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_758_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn new_state_is_empty() {
        let state = NotifierState::new(Duration::from_secs(300), Duration::from_secs(3600));
        assert!(state.previous_available.is_empty());
        assert!(state.last_notification_at.is_none());
        assert!(state.last_heartbeat_at.is_none());
        assert!(state.heartbeats_enabled());
    }

    #[test]
    fn default_uses_five_minute_gap_and_no_heartbeat() {
        let state = NotifierState::default();
        assert_eq!(state.min_notification_interval, Duration::from_secs(300));
        assert!(!state.heartbeats_enabled());
    }

    #[test]
    fn observe_overwrites_snapshot() {
        let mut state = NotifierState::default();
        state.observe(["2025-09-25".parse().unwrap()].into_iter().collect());
        assert_eq!(state.previous_available.len(), 1);
        state.observe(AvailabilitySnapshot::new());
        assert!(state.previous_available.is_empty());
    }

    #[test]
    fn elapsed_unset_is_infinite() {
        assert!(elapsed_at_least(t(0), None, Duration::from_secs(u64::MAX / 2)));
    }

    #[test]
    fn elapsed_boundaries() {
        let gap = Duration::from_secs(300);
        assert!(!elapsed_at_least(t(299), Some(t(0)), gap));
        assert!(elapsed_at_least(t(300), Some(t(0)), gap));
        assert!(elapsed_at_least(t(301), Some(t(0)), gap));
    }

    #[test]
    fn clock_going_backwards_counts_as_no_time() {
        assert!(!elapsed_at_least(t(0), Some(t(10)), Duration::from_secs(5)));
        assert!(elapsed_at_least(t(0), Some(t(10)), Duration::ZERO));
    }

    #[test]
    fn remaining_saturates() {
        let gap = Duration::from_secs(300);
        assert_eq!(remaining(t(100), Some(t(0)), gap), Duration::from_secs(200));
        assert_eq!(remaining(t(400), Some(t(0)), gap), Duration::ZERO);
        assert_eq!(remaining(t(0), None, gap), Duration::ZERO);
    }
}
