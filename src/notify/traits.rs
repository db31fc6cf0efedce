use async_trait::async_trait;
use tracing::{info, warn};

/// Rendered notification content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    /// Plain-text body; this is what chat channels send.
    pub text: String,
    pub html: String,
}

/// Where a notification goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Email address or phone number.
    pub address: String,
    /// Per-recipient gateway key (WhatsApp only).
    pub key: Option<String>,
}

impl Recipient {
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            key: None,
        }
    }

    pub fn phone(number: impl Into<String>, gateway_key: impl Into<String>) -> Self {
        Self {
            address: number.into(),
            key: Some(gateway_key.into()),
        }
    }
}

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// A logged, non-persisted record of a send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub channel: &'static str,
    pub recipient: String,
    pub outcome: DeliveryOutcome,
}

impl DeliveryAttempt {
    pub fn is_delivered(&self) -> bool {
        self.outcome == DeliveryOutcome::Delivered
    }
}

/// Outbound notification channel. New channels only need `id` and `try_send`.
///
/// Callers use [`send`](NotificationChannel::send) or
/// [`attempt`](NotificationChannel::attempt), which never return errors:
/// transport failures are logged and reported as an unsuccessful delivery.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Stable channel identifier (e.g. `email`, `whatsapp`).
    fn id(&self) -> &'static str;

    /// Perform the provider call.
    async fn try_send(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> anyhow::Result<()>;

    /// Send and record the outcome, swallowing errors.
    async fn attempt(&self, recipient: &Recipient, notification: &Notification) -> DeliveryAttempt {
        let outcome = match self.try_send(recipient, notification).await {
            Ok(()) => {
                info!(
                    channel = self.id(),
                    recipient = %recipient.address,
                    subject = %notification.subject,
                    "notification delivered"
                );
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    channel = self.id(),
                    recipient = %recipient.address,
                    error = %e,
                    "notification delivery failed"
                );
                DeliveryOutcome::Failed(e.to_string())
            }
        };
        DeliveryAttempt {
            channel: self.id(),
            recipient: recipient.address.clone(),
            outcome,
        }
    }

    /// Send and return `true` on success.
    async fn send(&self, recipient: &Recipient, notification: &Notification) -> bool {
        self.attempt(recipient, notification).await.is_delivered()
    }
}
