use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::warn;

use crate::config::FinderConfig;

/// Status codes worth retrying; everything else fails fast.
const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Build the shared HTTP client. Connections are pooled so repeated
/// queries against the same APIs reuse them.
pub fn build_client(config: &FinderConfig) -> Result<Client> {
    let timeout = Duration::from_secs(config.timeout_secs);
    ClientBuilder::new()
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .tcp_nodelay(true)
        // Timeouts
        .timeout(timeout)
        .connect_timeout(timeout)
        // Compression
        .gzip(true)
        .brotli(true)
        // TLS
        .use_rustls_tls()
        // Redirects
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(config.user_agent.clone())
        .build()
        .context("failed to build HTTP client")
}

/// Retry schedule for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_factor: f64,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FinderConfig) -> Self {
        Self {
            retries: config.retries,
            backoff_factor: config.backoff_factor,
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }

    /// Sleep before retry `attempt` (1-based): `factor * 2^(attempt-1)`,
    /// capped at `max_backoff`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let cap = self.max_backoff.as_secs_f64();
        let secs = (self.backoff_factor * (1u64 << exp) as f64).clamp(0.0, cap);
        Duration::from_secs_f64(secs)
    }
}

/// Issue a GET, retrying transport errors and retryable statuses with
/// exponential backoff. Any other error status fails immediately; GET is
/// the only method this helper sends.
pub async fn get_with_retries(
    client: &Client,
    url: &str,
    basic_auth: Option<(&str, &str)>,
    policy: &RetryPolicy,
) -> Result<String> {
    let max_attempts = policy.retries.saturating_add(1);
    for attempt in 1..=max_attempts {
        let mut request = client.get(url);
        if let Some((user, password)) = basic_auth {
            request = request.basic_auth(user, Some(password));
        }

        let failure = match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response.text().await.context("failed to read response body");
                }
                if !is_retryable_status(status) {
                    bail!("GET {url} returned {status}");
                }
                anyhow!("GET {url} returned {status}")
            }
            Err(err) => anyhow::Error::from(err).context(format!("GET {url} failed")),
        };

        if attempt == max_attempts {
            return Err(failure.context(format!("giving up after {max_attempts} attempts")));
        }
        let delay = policy.delay_for(attempt);
        warn!(attempt, "transient failure on GET {}, retrying in {:?}: {:#}", url, delay, failure);
        tokio::time::sleep(delay).await;
    }
    bail!("GET {url} failed after {max_attempts} attempts")
}

fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUS.contains(&status.as_u16())
}
