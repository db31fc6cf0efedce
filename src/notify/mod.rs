//! Outbound notification channels.
//!
//! - [`EmailChannel`] posts to a transactional email API.
//! - [`WhatsAppChannel`] calls a keyed WhatsApp HTTP gateway.
//! - [`ReminderDispatcher`] fans a reminder out to every enabled channel.

pub mod dispatch;
pub mod email;
pub mod traits;
pub mod whatsapp;

pub use dispatch::{ReminderDelivery, ReminderDispatcher, render_reminder};
pub use email::EmailChannel;
pub use traits::{DeliveryAttempt, DeliveryOutcome, Notification, NotificationChannel, Recipient};
pub use whatsapp::WhatsAppChannel;

/// Escape text for inclusion in an HTML body.
pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
