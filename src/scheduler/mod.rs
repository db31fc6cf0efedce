//! Background loops: reminder delivery and keep-alive pings.
//!
//! Both loops are spawned tokio tasks stopped through a shared
//! [`CancellationToken`](tokio_util::sync::CancellationToken).

pub mod clock;
pub mod keepalive;
pub mod runner;

pub use clock::{Clock, ManualClock, SystemClock};
pub use keepalive::KeepAlivePinger;
pub use runner::{ReminderScheduler, TICK_INTERVAL_SECS, TickReport};
