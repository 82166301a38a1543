//! Availability source abstraction and the timeout-bounded acquisition step.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use ticketwatch_core::{AvailabilityResult, AvailabilitySnapshot, TicketDate};

/// Errors a source may report. "Nothing available" is not an error.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar page returned {0}")]
    Status(reqwest::StatusCode),

    #[error("{0}")]
    Other(String),
}

/// Produces the set of currently available dates among a target list.
#[async_trait::async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Check the given dates. Must return `Ok` with an empty set when none are
    /// available, and `Err` only for genuine transport or page failures.
    async fn check_availability(
        &self,
        targets: &[TicketDate],
    ) -> Result<AvailabilitySnapshot, SourceError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Run one availability check bounded by `timeout`.
///
/// Errors, timeouts and panics inside the source all come back as
/// [`AvailabilityResult::SourceUnavailable`] and are logged here.
pub async fn acquire_snapshot(
    source: &dyn AvailabilitySource,
    targets: &[TicketDate],
    timeout: Duration,
) -> AvailabilityResult {
    let attempt = AssertUnwindSafe(source.check_availability(targets)).catch_unwind();
    let result = match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(Ok(dates))) => AvailabilityResult::Found(dates),
        Ok(Ok(Err(e))) => AvailabilityResult::unavailable(e.to_string()),
        Ok(Err(panic)) => {
            AvailabilityResult::unavailable(format!("source panicked: {}", panic_message(panic.as_ref())))
        }
        Err(_) => AvailabilityResult::unavailable(format!("timed out after {timeout:?}")),
    };

    if let AvailabilityResult::SourceUnavailable { reason } = &result {
        tracing::warn!(
            source = source.name(),
            %reason,
            "availability check failed, treating as no availability"
        );
    }
    result
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
