//! Task record and mutation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-owned to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique identifier (UUID v4).
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Non-empty title.
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "dueDate")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "reminderTime")]
    pub reminder_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    /// Set only after a reminder for the current `reminder_at` was delivered.
    #[serde(default)]
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns `true` if a reminder is owed at `now`.
    pub fn reminder_due(&self, now: DateTime<Utc>) -> bool {
        !self.completed && !self.reminder_sent && self.reminder_at.is_some_and(|at| at <= now)
    }
}

/// Fields for a task about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
}

impl NewTask {
    /// Create a new task definition with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build the persisted record, assigning a fresh id.
    pub fn into_task(self, owner_id: &str, now: DateTime<Utc>) -> Task {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_owned(),
            title: self.title.trim().to_owned(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            due_at: self.due_at,
            reminder_at: self.reminder_at,
            completed: false,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tri-state update for a field that can be explicitly cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Leave the stored value as is.
    #[default]
    Keep,
    /// Remove the stored value.
    Clear,
    /// Replace the stored value.
    Set(T),
}

/// Partial update of a task. `None` / [`FieldUpdate::Keep`] leave fields untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: FieldUpdate<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Patch that marks a task complete.
    pub fn complete() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }

    /// Apply the specified fields to `task` and stamp `updated_at`.
    ///
    /// Moving `reminder_at` to a different instant re-arms the reminder by
    /// clearing `reminder_sent`.
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            let title = title.trim();
            if !title.is_empty() {
                task.title = title.to_owned();
            }
        }
        match &self.description {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => task.description = None,
            FieldUpdate::Set(text) => task.description = Some(text.clone()),
        }
        if let Some(due) = self.due_at {
            task.due_at = Some(due);
        }
        if let Some(reminder) = self.reminder_at
            && task.reminder_at != Some(reminder)
        {
            task.reminder_at = Some(reminder);
            task.reminder_sent = false;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.updated_at = now;
    }
}
