use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use campcook_api_client::CollectorClient;
use campcook_daemon::{SyncEngine, config, health, scheduler};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    let filter = match "campcook_daemon=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        error!("Daemon fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    info!("campcook-daemon starting");

    let cfg = config::load_config()?;
    let client = CollectorClient::from_config(&cfg).context("collector endpoint")?;
    info!("Collector: {}", client.base_url());

    let store = Arc::new(config::open_store(&cfg)?);
    let data_dir = config::data_dir(&cfg)?;
    let pid_path = campcook_paths::pid_file_path(&data_dir);
    write_pid_file(&pid_path)?;

    let engine = SyncEngine::new(store, client.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let resume_handle = tokio::spawn(scheduler::run_resume_loop(
        engine.clone(),
        cfg.sync.retry_interval_secs,
        shutdown_rx.clone(),
    ));

    let health_handle = tokio::spawn(health::run_health_check(
        client,
        cfg.sync.health_check_interval_secs,
        shutdown_rx,
    ));

    wait_for_shutdown().await;

    info!("Shutdown signal received, stopping...");
    let _ = shutdown_tx.send(true);

    let _ = resume_handle.await;
    let _ = health_handle.await;

    if tokio::time::timeout(DRAIN_TIMEOUT, engine.wait_idle())
        .await
        .is_err()
    {
        warn!(
            workers = engine.active_workers(),
            "sync still in flight at shutdown; pending teams resume on next start"
        );
    }

    cleanup_pid_file(&pid_path);

    info!("campcook-daemon stopped");
    Ok(())
}

/// Write PID file so the CLI can find us
fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, std::process::id().to_string())?;
    info!("PID file written: {}", path.display());
    Ok(())
}

fn cleanup_pid_file(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Wait for SIGTERM or SIGINT
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            _ => {
                warn!("Could not register signal handlers, falling back to Ctrl+C");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Ctrl+C handler failed: {e}");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Ctrl+C handler failed: {e}");
        }
        info!("Received Ctrl+C");
    }
}
