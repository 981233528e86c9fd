//! Frigate notifier - push notifications for Frigate NVR object events
//!
//! Subscribes to `frigate/events` on an MQTT broker and sends ntfy
//! notifications when an object is first detected, enters new zones, or
//! leaves view.
//!
//! Module structure:
//! - `domain/` - Core types (Event, Decision, NotificationPayload)
//! - `io/` - External interfaces (MQTT, ntfy)
//! - `services/` - Event logic (Throttle, Parser, StateTracker, Composer, Pipeline)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use frigate_notifier::infra::{Config, Metrics};
use frigate_notifier::io::{start_mqtt_client, Notifier, NtfyClient};
use frigate_notifier::services::{create_notify_worker, Pipeline, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// How long queued notifications may take to flush on exit
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Frigate notifier - MQTT object events to ntfy push notifications
#[derive(Parser, Debug)]
#[command(name = "frigate-notifier", version, about)]
struct Args {
    /// Path to an optional TOML configuration file (environment variables take precedence)
    #[arg(short, long)]
    config: Option<String>,
}

/// Structured logging; RUST_LOG wins over the configured LOG_LEVEL
fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_level());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        "frigate-notifier starting"
    );

    // Secrets are only reported as present/absent
    info!(
        config_file = ?config.config_file(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        mqtt_client_id = %config.mqtt_client_id(),
        mqtt_topic = %config.mqtt_topic(),
        mqtt_auth = %config.mqtt_username().is_some(),
        ntfy_server_url = %config.ntfy_server_url(),
        ntfy_topic = %config.ntfy_topic(),
        ntfy_auth = %(config.ntfy_username().is_some() && config.ntfy_password().is_some()),
        message_timeout_secs = %config.message_timeout_secs(),
        frigate_base_url = %config.frigate_base_url(),
        state_eviction = %config.state_eviction().as_str(),
        log_level = %config.log_level(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());

    let notifier: Arc<dyn Notifier> = match NtfyClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "ntfy_client_init_failed");
            std::process::exit(1);
        }
    };

    let retry = RetryPolicy { max_retries: config.ntfy_max_retries(), ..RetryPolicy::default() };
    let (notify_tx, worker) =
        create_notify_worker(notifier, metrics.clone(), config.notify_queue_size(), retry);
    let worker_handle = tokio::spawn(worker.run());

    // Periodic metrics summary (0 disables)
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                metrics_clone.report().log();
            }
        });
    }

    // Handle shutdown on Ctrl+C
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let mut pipeline = Pipeline::from_config(&config, metrics.clone());
    let result = start_mqtt_client(&config, &mut pipeline, &notify_tx, shutdown_rx).await;

    // Closing the queue lets the worker flush what is left, status messages included
    drop(notify_tx);
    if tokio::time::timeout(DRAIN_TIMEOUT, worker_handle).await.is_err() {
        warn!("notify_worker_drain_timeout");
    }

    match result {
        Ok(()) => {
            metrics.report().log();
            info!("frigate-notifier shutdown complete");
        }
        Err(e) => {
            error!(error = %e, "mqtt_startup_failed");
            std::process::exit(1);
        }
    }
}
