//! Notifier trait definition and shared error types.

use std::fmt;
use std::time::Duration;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("notifier aborted: {0}")]
    Aborted(String),
}

/// What a notification is about. Used for logging only; the wire payload
/// is the same three-field shape for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Availability,
    Heartbeat,
    Test,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Availability => write!(f, "availability"),
            NotificationKind::Heartbeat => write!(f, "heartbeat"),
            NotificationKind::Test => write!(f, "test"),
        }
    }
}

/// A rendered notification ready for delivery.
///
/// Serializes to the three opaque value fields accepted by maker-style
/// webhooks: `{"value1": summary, "value2": link, "value3": timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Notification {
    /// Human-readable summary (e.g. the available dates).
    #[serde(rename = "value1")]
    pub summary: String,
    /// Reference link or secondary detail line.
    #[serde(rename = "value2")]
    pub link: String,
    /// RFC 3339 timestamp of when the notification was built.
    #[serde(rename = "value3")]
    pub timestamp: String,
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel. Exactly one attempt.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook").
    fn channel_name(&self) -> &str;
}

/// Result of one delivery attempt.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub kind: NotificationKind,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
