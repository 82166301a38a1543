//! Boundary between the poll loop and the delivery channel.
//!
//! The dispatcher makes one timeout-bounded delivery attempt per call and
//! turns every failure (transport error, bad status, timeout, even a panic
//! inside the channel) into `false` plus a log line. It never retries.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use ticketwatch_core::{join_dates, AvailabilitySnapshot, TicketDate};

use crate::payload::{availability_notification, heartbeat_notification, test_notification};
use crate::traits::{DispatchResult, Notification, NotificationKind, Notifier, NotifyError};

/// Delivers availability, heartbeat, and test notifications through one channel.
pub struct Dispatcher {
    channel: Box<dyn Notifier>,
    /// Reference link carried in availability payloads (the calendar page).
    link: String,
    /// Hard cap on a single delivery attempt.
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(channel: Box<dyn Notifier>, link: impl Into<String>, send_timeout: Duration) -> Self {
        Self {
            channel,
            link: link.into(),
            send_timeout,
        }
    }

    /// Notify about newly available dates. Returns `true` only on confirmed delivery.
    ///
    /// An empty date set is refused without contacting the channel.
    pub async fn dispatch_availability(
        &self,
        dates: &AvailabilitySnapshot,
        now: DateTime<Utc>,
    ) -> bool {
        if dates.is_empty() {
            tracing::warn!("no available dates to notify about");
            return false;
        }
        tracing::info!(dates = %join_dates(dates), "sending availability notification");
        let notification = availability_notification(dates, &self.link, now);
        self.deliver(NotificationKind::Availability, &notification)
            .await
            .success
    }

    /// Send the heartbeat payload. Returns `true` only on confirmed delivery.
    pub async fn dispatch_heartbeat(&self, targets: &[TicketDate], now: DateTime<Utc>) -> bool {
        let notification = heartbeat_notification(targets, now);
        self.deliver(NotificationKind::Heartbeat, &notification)
            .await
            .success
    }

    /// Send a test notification to verify the channel configuration.
    pub async fn test_channel(&self) -> bool {
        let notification = test_notification(Utc::now());
        self.deliver(NotificationKind::Test, &notification)
            .await
            .success
    }

    /// Make exactly one delivery attempt and record its outcome.
    pub async fn deliver(
        &self,
        kind: NotificationKind,
        notification: &Notification,
    ) -> DispatchResult {
        let start = Instant::now();
        let attempt = AssertUnwindSafe(self.channel.send(notification)).catch_unwind();
        let result = match tokio::time::timeout(self.send_timeout, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(NotifyError::Aborted(panic_message(panic.as_ref()))),
            Err(_) => Err(NotifyError::Timeout(self.send_timeout)),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, error) = match result {
            Ok(()) => {
                tracing::info!(
                    channel = self.channel.channel_name(),
                    %kind,
                    duration_ms,
                    "Notification delivered"
                );
                (true, None)
            }
            Err(e) => {
                tracing::warn!(
                    channel = self.channel.channel_name(),
                    %kind,
                    error = %e,
                    duration_ms,
                    "Notification delivery failed"
                );
                (false, Some(e.to_string()))
            }
        };

        DispatchResult {
            channel: self.channel.channel_name().to_string(),
            kind,
            success,
            error,
            duration_ms,
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Hang,
        Panic,
    }

    struct MockNotifier {
        send_count: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<Notification>>>,
        behavior: Behavior,
    }

    impl MockNotifier {
        fn new(behavior: Behavior) -> (Self, Arc<AtomicUsize>, Arc<Mutex<Vec<Notification>>>) {
            let count = Arc::new(AtomicUsize::new(0));
            let sent = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    send_count: count.clone(),
                    sent: sent.clone(),
                    behavior,
                },
                count,
                sent,
            )
        }
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(notification.clone());
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => Err(NotifyError::Config("mock failure".to_string())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Ok(())
                }
                Behavior::Panic => panic!("mock notifier exploded"),
            }
        }
        fn channel_name(&self) -> &str {
            "mock"
        }
    }

    fn dates(ds: &[&str]) -> AvailabilitySnapshot {
        ds.iter().map(|d| d.parse().unwrap()).collect()
    }

    fn dispatcher(behavior: Behavior) -> (Dispatcher, Arc<AtomicUsize>, Arc<Mutex<Vec<Notification>>>) {
        let (mock, count, sent) = MockNotifier::new(behavior);
        (
            Dispatcher::new(Box::new(mock), "https://tickets.example.com/calendar", Duration::from_secs(30)),
            count,
            sent,
        )
    }

    #[tokio::test]
    async fn availability_success() {
        let (d, count, sent) = dispatcher(Behavior::Succeed);
        assert!(d.dispatch_availability(&dates(&["2025-09-25"]), Utc::now()).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0].summary, "2025-09-25");
        assert_eq!(sent[0].link, "https://tickets.example.com/calendar");
    }

    #[tokio::test]
    async fn failure_becomes_false_without_retry() {
        let (d, count, _) = dispatcher(Behavior::Fail);
        assert!(!d.dispatch_availability(&dates(&["2025-09-25"]), Utc::now()).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_dates_are_refused() {
        let (d, count, _) = dispatcher(Behavior::Succeed);
        assert!(!d.dispatch_availability(&dates(&[]), Utc::now()).await);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_channel_times_out() {
        let (d, count, _) = dispatcher(Behavior::Hang);
        let result = d
            .deliver(NotificationKind::Test, &test_notification(Utc::now()))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_channel_becomes_false() {
        let (d, _, _) = dispatcher(Behavior::Panic);
        let result = d
            .deliver(NotificationKind::Heartbeat, &test_notification(Utc::now()))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("mock notifier exploded"));
    }

    #[tokio::test]
    async fn heartbeat_uses_heartbeat_payload() {
        let (d, _, sent) = dispatcher(Behavior::Succeed);
        let targets: Vec<TicketDate> = vec!["2025-09-25".parse().unwrap()];
        assert!(d.dispatch_heartbeat(&targets, Utc::now()).await);
        assert_eq!(
            sent.lock().unwrap()[0].summary,
            crate::payload::HEARTBEAT_SUMMARY
        );
    }

    #[tokio::test]
    async fn test_channel_reports_outcome() {
        let (ok, _, _) = dispatcher(Behavior::Succeed);
        let (bad, _, _) = dispatcher(Behavior::Fail);
        assert!(ok.test_channel().await);
        assert!(!bad.test_channel().await);
    }
}
