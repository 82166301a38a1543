//! The poll loop: the only scheduled actor, and sole owner of [`NotifierState`].
//!
//! Each tick acquires a snapshot, runs change detection and the gate,
//! dispatches if permitted, records the snapshot, then checks the heartbeat.
//! Between ticks the loop sleeps until the next poll or until the
//! cancellation token fires, whichever comes first.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ticketwatch_core::gate::{self, GateDecision};
use ticketwatch_core::{
    heartbeat_due, join_dates, newly_available, AvailabilityResult, AvailabilitySnapshot,
    NotifierState, TicketDate,
};
use ticketwatch_notify::Dispatcher;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::source::{acquire_snapshot, AvailabilitySource};

/// Where the loop currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Polling,
    Evaluating,
    Dispatching,
    Sleeping,
    Stopped,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopPhase::Idle => write!(f, "idle"),
            LoopPhase::Polling => write!(f, "polling"),
            LoopPhase::Evaluating => write!(f, "evaluating"),
            LoopPhase::Dispatching => write!(f, "dispatching"),
            LoopPhase::Sleeping => write!(f, "sleeping"),
            LoopPhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Static settings for a [`PollLoop`].
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub targets: Vec<TicketDate>,
    pub poll_interval: Duration,
    /// Cap on one snapshot acquisition.
    pub source_timeout: Duration,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// The snapshot could not be acquired and was treated as empty.
    pub source_failed: bool,
    /// Snapshot folded into state this tick.
    pub current: AvailabilitySnapshot,
    pub decision: GateDecision,
    /// An availability notification was delivered.
    pub notified: bool,
    /// `None` when no heartbeat was due, otherwise whether it was delivered.
    pub heartbeat: Option<bool>,
}

pub struct PollLoop {
    source: Box<dyn AvailabilitySource>,
    dispatcher: Dispatcher,
    state: NotifierState,
    settings: LoopSettings,
    cancel: CancellationToken,
    phase: LoopPhase,
}

impl PollLoop {
    pub fn new(
        source: Box<dyn AvailabilitySource>,
        dispatcher: Dispatcher,
        state: NotifierState,
        settings: LoopSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            dispatcher,
            state,
            settings,
            cancel,
            phase: LoopPhase::Idle,
        }
    }

    pub fn state(&self) -> &NotifierState {
        &self.state
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    fn enter(&mut self, phase: LoopPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "poll loop transition");
            self.phase = phase;
        }
    }

    /// Run until cancelled, then hand back the final state.
    pub async fn run(mut self) -> NotifierState {
        info!(
            targets = ?self.settings.targets.iter().map(TicketDate::as_str).collect::<Vec<_>>(),
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            min_notification_interval_secs = self.state.min_notification_interval.as_secs(),
            heartbeat_interval_secs = self.state.heartbeat_interval.as_secs(),
            "starting availability polling"
        );

        loop {
            let Some(result) = self.acquire().await else {
                break;
            };
            self.evaluate(result, Utc::now()).await;
            if !self.sleep().await {
                break;
            }
        }

        self.enter(LoopPhase::Stopped);
        info!("polling stopped");
        self.state
    }

    /// One full tick evaluated at `now`. `None` if cancellation was observed
    /// before or during acquisition, in which case state is untouched.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> Option<TickReport> {
        let result = self.acquire().await?;
        Some(self.evaluate(result, now).await)
    }

    /// Acquire a snapshot unless cancelled first.
    async fn acquire(&mut self) -> Option<AvailabilityResult> {
        if self.cancel.is_cancelled() {
            self.enter(LoopPhase::Stopped);
            return None;
        }
        self.enter(LoopPhase::Polling);

        let acquisition = acquire_snapshot(
            self.source.as_ref(),
            &self.settings.targets,
            self.settings.source_timeout,
        );
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("cancelled during availability check");
                None
            }
            result = acquisition => Some(result),
        }
    }

    /// The rest of a tick once a snapshot is in hand.
    pub async fn evaluate(&mut self, result: AvailabilityResult, now: DateTime<Utc>) -> TickReport {
        self.enter(LoopPhase::Evaluating);

        let source_failed = result.is_unavailable();
        let current = result.into_snapshot();
        if current.is_empty() {
            debug!("no availability found");
        } else {
            info!(dates = %join_dates(&current), "availability detected");
        }

        let newly = newly_available(&current, &self.state.previous_available);
        let decision = gate::evaluate(newly, &self.state, now);

        let mut notified = false;
        match &decision {
            GateDecision::NoChange => debug!("no new dates to notify about"),
            GateDecision::RateLimited { suppressed, retry_in } => info!(
                dates = %join_dates(suppressed),
                retry_in_secs = retry_in.as_secs(),
                "skipping notification due to rate limiting"
            ),
            GateDecision::Dispatch(dates) => {
                self.enter(LoopPhase::Dispatching);
                notified = self.dispatcher.dispatch_availability(dates, now).await;
                if notified {
                    self.state.record_notification_at(now);
                    info!(dates = %join_dates(dates), "notification sent for new dates");
                }
            }
        }

        self.state.observe(current.clone());

        let heartbeat = if heartbeat_due(now, &self.state) {
            self.enter(LoopPhase::Dispatching);
            let sent = self
                .dispatcher
                .dispatch_heartbeat(&self.settings.targets, now)
                .await;
            if sent {
                self.state.record_heartbeat_at(now);
                info!("heartbeat notification sent");
            }
            Some(sent)
        } else {
            None
        };

        TickReport {
            source_failed,
            current,
            decision,
            notified,
            heartbeat,
        }
    }

    /// Sleep one poll interval. Returns `false` if cancelled instead.
    async fn sleep(&mut self) -> bool {
        self.enter(LoopPhase::Sleeping);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settings.poll_interval) => true,
        }
    }
}
