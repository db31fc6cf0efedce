use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;

use crate::config::EmailConfig;
use crate::error::{Result, TaskError};
use crate::notify::traits::{Notification, NotificationChannel, Recipient};

const SEND_TIMEOUT_SECS: u64 = 15;

/// Transactional email channel (Resend-compatible `POST /emails`).
#[derive(Clone)]
pub struct EmailChannel {
    api_url: String,
    api_key: String,
    from_address: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for EmailChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailChannel")
            .field("api_url", &self.api_url)
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl EmailChannel {
    /// # Errors
    ///
    /// Returns [`TaskError::Configuration`] when no API key is set and
    /// [`TaskError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(TaskError::Configuration(
                "email delivery needs [email].api_key".to_owned(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .map_err(|e| TaskError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.api_url)
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn id(&self) -> &'static str {
        "email"
    }

    async fn try_send(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> anyhow::Result<()> {
        let to = recipient.address.trim();
        if to.is_empty() {
            bail!("no recipient address");
        }

        let payload = serde_json::json!({
            "from": self.from_address,
            "to": [to],
            "subject": notification.subject,
            "html": notification.html,
            "text": notification.text,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("email request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("email API returned {status}: {body}");
        }
        Ok(())
    }
}
