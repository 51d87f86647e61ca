//! plabel Labeler
//!
//! Labels the local machine with its platform facts. The process registers
//! itself as a worker with an in-process channel, runs the connect hook, and
//! logs the resulting tags.
//!
//! With `PLABEL_REFRESH_INTERVAL` set, it keeps running and re-reads the
//! label config on every interval, driving the configuration-change path
//! until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use plabel_labeler::config::Config;
use plabel_labeler::{AgentWorker, LocalChannel, MemoryRegistry, PlatformLabeler, Worker};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        worker = %config.worker_name,
        label_config = ?config.label_config_path,
        refresh_interval_secs = config.refresh_interval_secs,
        "Starting plabel labeler"
    );

    let label_config = config.load_label_config()?;
    let registry = Arc::new(MemoryRegistry::new());
    let worker: Arc<dyn Worker> = Arc::new(
        AgentWorker::new(config.worker_name.as_str()).with_channel(Arc::new(LocalChannel::new())),
    );
    registry.insert(Arc::clone(&worker));

    let labeler = Arc::new(PlatformLabeler::new(registry, label_config));
    let channel = worker.channel();
    labeler
        .on_connect(Some(worker.as_ref()), channel.as_deref())
        .await;
    log_tags(&labeler, worker.as_ref());

    if config.refresh_interval_secs == 0 {
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_handle = tokio::spawn({
        let labeler = Arc::clone(&labeler);
        let worker = Arc::clone(&worker);
        let config = config.clone();
        async move { run_refresh_loop(config, labeler, worker, shutdown_rx).await }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = refresh_handle => {
            if let Err(e) = result {
                error!(error = %e, "Refresh task panicked");
            }
        }
    }

    let _ = shutdown_tx.send(true);
    info!("Labeler shutdown complete");
    Ok(())
}

/// Re-read the label config and refresh all workers until shutdown.
async fn run_refresh_loop(
    config: Config,
    labeler: Arc<PlatformLabeler>,
    worker: Arc<dyn Worker>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.refresh_interval_secs));
    // The first tick fires immediately; the connect hook already ran.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let label_config = match config.load_label_config() {
                    Ok(label_config) => Some(label_config),
                    Err(e) => {
                        error!(error = %e, "Failed to reload label config, keeping current");
                        None
                    }
                };
                labeler.on_configuration_change(label_config).await;
                log_tags(&labeler, worker.as_ref());
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Refresh loop shutting down");
                    break;
                }
            }
        }
    }
}

fn log_tags(labeler: &PlatformLabeler, worker: &dyn Worker) {
    let tags: Vec<String> = labeler
        .lookup_tags(Some(worker))
        .into_iter()
        .map(|tag| tag.to_string())
        .collect();
    info!(worker = ?worker.display_name(), ?tags, "Platform tags");
}
