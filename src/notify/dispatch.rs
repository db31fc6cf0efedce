//! Reminder rendering and multi-channel dispatch.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::notify::escape_html;
use crate::notify::traits::{DeliveryAttempt, Notification, NotificationChannel, Recipient};
use crate::tasks::Task;
use crate::users::UserProfile;

/// Human-readable timestamp used in reminder and report bodies.
pub(crate) const DISPLAY_TIME_FORMAT: &str = "%a %d %b %Y, %H:%M UTC";

/// Outcome of dispatching one reminder across every enabled channel.
#[derive(Debug, Clone, Default)]
pub struct ReminderDelivery {
    pub attempts: Vec<DeliveryAttempt>,
}

impl ReminderDelivery {
    /// `true` when at least one channel delivered.
    pub fn delivered(&self) -> bool {
        self.attempts.iter().any(DeliveryAttempt::is_delivered)
    }
}

/// Sends reminders to a task owner over email and WhatsApp.
#[derive(Clone, Default)]
pub struct ReminderDispatcher {
    email: Option<Arc<dyn NotificationChannel>>,
    whatsapp: Option<Arc<dyn NotificationChannel>>,
}

impl ReminderDispatcher {
    pub fn new(
        email: Option<Arc<dyn NotificationChannel>>,
        whatsapp: Option<Arc<dyn NotificationChannel>>,
    ) -> Self {
        Self { email, whatsapp }
    }

    /// Channels paired with the owner's recipient details, in attempt order.
    fn targets(&self, profile: &UserProfile) -> Vec<(&Arc<dyn NotificationChannel>, Recipient)> {
        let mut targets = Vec::with_capacity(2);

        if profile.email_reminders
            && let Some(channel) = &self.email
        {
            match profile.email.as_deref().map(str::trim) {
                Some(address) if !address.is_empty() => {
                    targets.push((channel, Recipient::email(address)));
                }
                _ => debug!(owner = %profile.id, "email reminders enabled but no address"),
            }
        }

        if profile.whatsapp_reminders
            && let Some(channel) = &self.whatsapp
        {
            match (profile.phone.as_deref(), profile.whatsapp_api_key.as_deref()) {
                (Some(phone), Some(key)) if !phone.trim().is_empty() && !key.trim().is_empty() => {
                    targets.push((channel, Recipient::phone(phone, key)));
                }
                _ => debug!(
                    owner = %profile.id,
                    "WhatsApp reminders enabled but phone or gateway key missing"
                ),
            }
        }

        targets
    }

    /// Render and send the reminder for `task` on every enabled channel.
    ///
    /// All channels are attempted even after one succeeds.
    pub async fn dispatch(&self, task: &Task, profile: &UserProfile) -> ReminderDelivery {
        let notification = render_reminder(task, profile);
        let targets = self.targets(profile);
        if targets.is_empty() {
            warn!(task_id = %task.id, owner = %profile.id, "no reminder channel available");
            return ReminderDelivery::default();
        }

        let mut delivery = ReminderDelivery::default();
        for (channel, recipient) in targets {
            delivery
                .attempts
                .push(channel.attempt(&recipient, &notification).await);
        }
        delivery
    }
}

/// Build the reminder message for a task.
pub fn render_reminder(task: &Task, profile: &UserProfile) -> Notification {
    let name = profile.greeting_name();
    let subject = format!("Reminder: {}", task.title);

    let mut text = format!("Hi {name}, this is your reminder for \"{}\".", task.title);
    let mut html = format!(
        "<p>Hi {}, this is your reminder for <strong>{}</strong>.</p>",
        escape_html(name),
        escape_html(&task.title)
    );

    if let Some(due) = task.due_at {
        let due = due.format(DISPLAY_TIME_FORMAT);
        text.push_str(&format!("\nDue: {due}"));
        html.push_str(&format!("<p>Due: {due}</p>"));
    }
    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        text.push_str(&format!("\n{description}"));
        html.push_str(&format!("<p>{}</p>", escape_html(description)));
    }

    Notification {
        subject,
        text,
        html,
    }
}
