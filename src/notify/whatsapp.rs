use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;

use crate::config::WhatsAppConfig;
use crate::error::{Result, TaskError};
use crate::notify::traits::{Notification, NotificationChannel, Recipient};

const SEND_TIMEOUT_SECS: u64 = 15;

/// WhatsApp delivery through a keyed HTTP gateway.
///
/// The gateway takes `phone`, `text` and `apikey` as query parameters. The key
/// belongs to the recipient, so it travels on the [`Recipient`].
#[derive(Debug, Clone)]
pub struct WhatsAppChannel {
    gateway_url: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .map_err(|e| TaskError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            gateway_url: config.gateway_url.clone(),
            client,
        })
    }

    /// Send a plain chat message with an explicit gateway key.
    pub async fn send_with_key(&self, phone: &str, text: &str, api_key: &str) -> bool {
        let note = Notification {
            subject: String::new(),
            text: text.to_owned(),
            html: String::new(),
        };
        self.send(&Recipient::phone(phone, api_key), &note).await
    }
}

/// Gateway numbers are digits with an optional leading `+`.
fn normalize_phone(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.trim().chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    out
}

#[async_trait]
impl NotificationChannel for WhatsAppChannel {
    fn id(&self) -> &'static str {
        "whatsapp"
    }

    async fn try_send(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> anyhow::Result<()> {
        let phone = normalize_phone(&recipient.address);
        if phone.trim_start_matches('+').is_empty() {
            bail!("no recipient phone number");
        }
        let Some(key) = recipient.key.as_deref().filter(|k| !k.trim().is_empty()) else {
            bail!("no WhatsApp gateway key for recipient");
        };

        let response = self
            .client
            .get(&self.gateway_url)
            .query(&[
                ("phone", phone.as_str()),
                ("text", notification.text.as_str()),
                ("apikey", key),
            ])
            .send()
            .await
            .context("WhatsApp gateway request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("WhatsApp gateway returned {status}: {body}");
        }
        Ok(())
    }
}
