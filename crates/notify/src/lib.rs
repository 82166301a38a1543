//! Notification delivery for ticket availability alerts.
//!
//! This crate provides:
//! - `Notifier` trait for the delivery channel
//! - `WebhookNotifier`, a JSON-over-HTTP implementation
//! - Payload builders for availability, heartbeat, and test messages
//! - `Dispatcher`, the bool-returning, never-retrying boundary used by the poll loop

pub mod dispatcher;
pub mod mask;
pub mod payload;
pub mod traits;
pub mod webhook;

pub use dispatcher::Dispatcher;
pub use mask::mask_sensitive_url;
pub use traits::{DispatchResult, Notification, NotificationKind, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
