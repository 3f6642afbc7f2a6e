use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Configuration for retry behaviour on POST requests to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: usize,
    /// Delay before each retry, in seconds.
    pub delays: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::with_max_retries(3)
    }
}

impl RetryConfig {
    /// Exponential backoff: 1s, 2s, 4s, ...
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self {
            max_retries,
            delays: (0..max_retries).map(|i| 1u64 << i.min(6)).collect(),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delays: Vec::new(),
        }
    }
}

/// Run `send` with exponential backoff.
///
/// Retries on network errors and 5xx responses. Returns immediately on
/// success or 4xx. `send` is called once per attempt so request bodies that
/// cannot be cloned (multipart forms) can be rebuilt.
pub async fn retry_send<F, Fut>(
    what: &str,
    config: &RetryConfig,
    mut send: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let max_attempts = config.max_retries + 1;
    let mut attempt = 0;
    loop {
        let delay = config.delays.get(attempt).copied();
        match send().await {
            Ok(resp) if resp.status().is_server_error() => match delay {
                Some(secs) if attempt + 1 < max_attempts => {
                    warn!(
                        "{what} attempt {}/{} failed (HTTP {}), retrying in {secs}s",
                        attempt + 1,
                        max_attempts,
                        resp.status(),
                    );
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
                _ => return Ok(resp),
            },
            Ok(resp) => return Ok(resp),
            Err(e) => match delay {
                Some(secs) if attempt + 1 < max_attempts => {
                    warn!(
                        "{what} attempt {}/{} failed ({e}), retrying in {secs}s",
                        attempt + 1,
                        max_attempts,
                    );
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
                _ => return Err(e),
            },
        }
        attempt += 1;
    }
}
