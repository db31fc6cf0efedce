//! Reminder scheduler background loop.
//!
//! Spawns a tokio task that periodically looks for tasks whose reminder is
//! owed, sends it through the [`ReminderDispatcher`], and only then marks the
//! reminder as sent.
//!
//! Delivery is at-least-once: a failed or interrupted send leaves the flag
//! clear and the next tick retries. A single scheduler instance per store is
//! assumed; two instances may both send the same reminder.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TaskError};
use crate::notify::ReminderDispatcher;
use crate::scheduler::clock::Clock;
use crate::tasks::{Task, TaskStore};
use crate::users::UserDirectory;

/// Interval between scheduler ticks (seconds).
pub const TICK_INTERVAL_SECS: u64 = 60;

/// Counts from one scheduler tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Reminders found due.
    pub due: usize,
    /// Reminders delivered and marked.
    pub delivered: usize,
    /// Reminders left for the next tick.
    pub failed: usize,
}

/// Background scheduler delivering task reminders.
pub struct ReminderScheduler {
    store: Arc<dyn TaskStore>,
    users: Arc<dyn UserDirectory>,
    dispatcher: ReminderDispatcher,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn TaskStore>,
        users: Arc<dyn UserDirectory>,
        dispatcher: ReminderDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            users,
            dispatcher,
            clock,
            interval: Duration::from_secs(TICK_INTERVAL_SECS),
        }
    }

    /// Override the tick interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(10));
        self
    }

    /// Start the background loop. It stops when `cancel` fires.
    pub fn run(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "reminder scheduler started");
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                match self.tick().await {
                    Ok(report) if report.due > 0 => info!(
                        due = report.due,
                        delivered = report.delivered,
                        failed = report.failed,
                        "reminder tick finished"
                    ),
                    Ok(_) => debug!("reminder tick: nothing due"),
                    Err(e) => error!("reminder tick failed: {e}"),
                }
            }
            info!("reminder scheduler stopped");
        })
    }

    /// Execute one scheduler tick: send every due reminder.
    ///
    /// Tasks are processed one after another. A failure on one task is logged
    /// and does not stop the rest.
    ///
    /// # Errors
    ///
    /// Returns an error only when the due-reminder query itself fails.
    pub async fn tick(&self) -> Result<TickReport> {
        let now = self.clock.now();
        let due = self.store.find_due_reminders(now).await?;
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        for task in due {
            match self.remind(&task).await {
                Ok(true) => report.delivered += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    warn!(task_id = %task.id, owner = %task.owner_id, "reminder failed: {e}");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Send one reminder and mark it. Returns whether it was delivered.
    async fn remind(&self, task: &Task) -> Result<bool> {
        let Some(reminder_at) = task.reminder_at else {
            return Ok(false);
        };
        let profile = self.users.profile(&task.owner_id).await?.ok_or_else(|| {
            TaskError::NotFound(format!("no user profile for owner {}", task.owner_id))
        })?;

        let delivery = self.dispatcher.dispatch(task, &profile).await;
        if !delivery.delivered() {
            debug!(
                task_id = %task.id,
                attempts = delivery.attempts.len(),
                "reminder not delivered, will retry next tick"
            );
            return Ok(false);
        }

        if !self.store.mark_reminder_sent(&task.id, reminder_at).await? {
            // Rescheduled or deleted while sending; the new reminder time stays owed.
            info!(task_id = %task.id, "reminder changed during delivery, not marking");
        }
        Ok(true)
    }
}
