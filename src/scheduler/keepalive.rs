//! Periodic self-ping that keeps an idle-suspended host awake.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::KeepAliveConfig;
use crate::error::{Result, TaskError};

const PING_TIMEOUT_SECS: u64 = 10;

/// Issues `GET {url}` on a fixed interval. Outcomes are only logged.
#[derive(Debug, Clone)]
pub struct KeepAlivePinger {
    url: String,
    interval: Duration,
    client: reqwest::Client,
}

impl KeepAlivePinger {
    /// Build a pinger, or `None` when no URL is configured.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &KeepAliveConfig) -> Result<Option<Self>> {
        let url = config.url.trim();
        if url.is_empty() {
            return Ok(None);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PING_TIMEOUT_SECS))
            .build()
            .map_err(|e| TaskError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Some(Self {
            url: url.to_owned(),
            interval: Duration::from_secs(config.interval_secs.max(1)),
            client,
        }))
    }

    /// One ping. Returns `true` on a 2xx response.
    pub async fn ping(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(url = %self.url, status = %resp.status(), "keep-alive ping ok");
                true
            }
            Ok(resp) => {
                warn!(url = %self.url, status = %resp.status(), "keep-alive ping rejected");
                false
            }
            Err(e) => {
                warn!(url = %self.url, "keep-alive ping failed: {e}");
                false
            }
        }
    }

    /// Start the ping loop. The first ping happens after one full interval.
    pub fn run(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(url = %self.url, interval_secs = self.interval.as_secs(), "keep-alive started");
            let start = tokio::time::Instant::now() + self.interval;
            let mut interval = tokio::time::interval_at(start, self.interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                self.ping().await;
            }
            debug!("keep-alive stopped");
        })
    }
}
