use campcook_api_client::{ClientError, CollectorClient};
use campcook_api_types::StatusResponse;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One connectivity probe against the collector's status endpoint.
pub async fn probe(client: &CollectorClient) -> Result<StatusResponse, ClientError> {
    let status = client.status().await?;
    if status.is_running() {
        debug!(
            students = status.students.unwrap_or(0),
            "collector reachable at {}",
            client.base_url()
        );
    } else {
        warn!(
            "collector at {} answered with status {:?}",
            client.base_url(),
            status.status
        );
    }
    Ok(status)
}

/// Run periodic health checks against the collector.
pub async fn run_health_check(
    client: CollectorClient,
    interval_secs: u64,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    if interval_secs == 0 {
        info!("Health checks disabled (interval_secs=0)");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = probe(&client).await {
                    warn!("Health check: collector unreachable ({e})");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("Health check shutting down");
                    break;
                }
            }
        }
    }
}
