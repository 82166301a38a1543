//! ticketwatch: polls a ticket calendar and posts a webhook when watched dates open up.
//!
//! Modes:
//! - default: run the poll loop until SIGINT/SIGTERM
//! - `--check-once`: print the currently available target dates and exit
//! - `--test-webhook`: send one test notification and exit

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ticketwatch_core::{join_dates, AvailabilityResult, NotifierState};
use ticketwatch_notify::{Dispatcher, WebhookNotifier};
use ticketwatch_watcher::{
    acquire_snapshot, CalendarPageSource, LoopSettings, PollLoop, WatchConfig,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Watch a ticket calendar and notify a webhook when target dates become available.
#[derive(Parser, Debug)]
#[command(name = "ticketwatch", version, about)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, env = "TICKETWATCH_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Check availability once, print the result, and exit.
    #[arg(long, conflicts_with = "test_webhook")]
    check_once: bool,

    /// Send a test notification and exit.
    #[arg(long)]
    test_webhook: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = WatchConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "{},reqwest=warn,hyper=warn",
                    config.logging.tracing_directive()
                ))
            }),
        )
        .init();

    info!(path = %cli.config.display(), "loaded config");

    let notifier = WebhookNotifier::new(&config.webhook.url, config.webhook_timeout())
        .context("failed to initialize webhook notifier")?;
    info!(
        url = %notifier.display_url(),
        event = %config.webhook.event_name,
        "webhook notifier ready"
    );
    let dispatcher = Dispatcher::new(
        Box::new(notifier),
        config.website.url.clone(),
        config.webhook_timeout(),
    );

    if cli.test_webhook {
        info!("sending test notification");
        if !dispatcher.test_channel().await {
            anyhow::bail!("test notification failed");
        }
        info!("test notification sent");
        return Ok(());
    }

    let source = CalendarPageSource::new(
        config.website.url.clone(),
        config.website.availability_class.clone(),
        config.request_timeout(),
    )
    .context("failed to initialize calendar source")?;

    if cli.check_once {
        return check_once(&config, &source).await;
    }

    if config.logging.is_debug() && !dispatcher.test_channel().await {
        warn!("startup test notification failed, continuing anyway");
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            os_signal().await;
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    let state = NotifierState::new(
        config.min_notification_interval(),
        config.heartbeat_interval(),
    );
    let settings = LoopSettings {
        targets: config.target_dates.clone(),
        poll_interval: config.poll_interval(),
        source_timeout: config.request_timeout(),
    };

    PollLoop::new(Box::new(source), dispatcher, state, settings, cancel)
        .run()
        .await;

    info!("ticketwatch exited cleanly");
    Ok(())
}

async fn check_once(config: &WatchConfig, source: &CalendarPageSource) -> anyhow::Result<()> {
    match acquire_snapshot(source, &config.target_dates, config.request_timeout()).await {
        AvailabilityResult::Found(dates) if dates.is_empty() => {
            println!("No target dates available");
        }
        AvailabilityResult::Found(dates) => {
            println!("Available: {}", join_dates(&dates));
        }
        AvailabilityResult::SourceUnavailable { reason } => {
            anyhow::bail!("availability check failed: {reason}");
        }
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere).
async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "failed to register signal handlers, falling back to ctrl_c");
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl_c");
        std::future::pending::<()>().await;
    }
}
