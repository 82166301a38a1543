//! Builders for the three notification payloads.

use chrono::{DateTime, SecondsFormat, Utc};
use ticketwatch_core::{join_dates, AvailabilitySnapshot, TicketDate};

use crate::traits::Notification;

pub const HEARTBEAT_SUMMARY: &str = "HEARTBEAT - ticketwatch is running";
pub const TEST_SUMMARY: &str = "TEST - ticketwatch";
pub const TEST_DETAIL: &str = "This is a test notification";

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Newly available dates, with a link back to the calendar page.
pub fn availability_notification(
    dates: &AvailabilitySnapshot,
    link: &str,
    now: DateTime<Utc>,
) -> Notification {
    Notification {
        summary: join_dates(dates),
        link: link.to_string(),
        timestamp: timestamp(now),
    }
}

/// Fixed "still alive" payload listing what is being watched.
pub fn heartbeat_notification(targets: &[TicketDate], now: DateTime<Utc>) -> Notification {
    let watched = targets
        .iter()
        .map(TicketDate::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Notification {
        summary: HEARTBEAT_SUMMARY.to_string(),
        link: format!("Watching {} date(s): {watched}", targets.len()),
        timestamp: timestamp(now),
    }
}

pub fn test_notification(now: DateTime<Utc>) -> Notification {
    Notification {
        summary: TEST_SUMMARY.to_string(),
        link: TEST_DETAIL.to_string(),
        timestamp: timestamp(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn dates(ds: &[&str]) -> Vec<TicketDate> {
        ds.iter().map(|d| d.parse().unwrap()).collect()
    }

    #[test]
    fn availability_lists_sorted_dates() {
        let snapshot: AvailabilitySnapshot =
            dates(&["2025-09-26", "2025-09-25"]).into_iter().collect();
        let n = availability_notification(&snapshot, "https://tickets.example.com", at());
        assert_eq!(n.summary, "2025-09-25, 2025-09-26");
        assert_eq!(n.link, "https://tickets.example.com");
        assert_eq!(n.timestamp, "2025-09-01T10:00:00Z");
    }

    #[test]
    fn heartbeat_is_distinct_from_availability() {
        let n = heartbeat_notification(&dates(&["2025-09-25", "2025-09-26"]), at());
        assert_eq!(n.summary, HEARTBEAT_SUMMARY);
        assert_eq!(n.link, "Watching 2 date(s): 2025-09-25, 2025-09-26");
        assert!(!n.summary.contains("2025-09-25"));
    }

    #[test]
    fn test_payload_is_marked() {
        let n = test_notification(at());
        assert!(n.summary.starts_with("TEST"));
        assert_eq!(n.link, TEST_DETAIL);
    }
}
