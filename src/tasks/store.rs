//! Task store contract and the in-process implementation.
//!
//! Every mutation targets a single task by id. There are no cross-document
//! transactions; concurrent writers on the same task are last-write-wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::tasks::model::{Task, TaskPatch};

/// Document-store operations the core depends on.
///
/// List operations return tasks in the store's natural (insertion) order.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks owned by `owner_id`.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Task>>;

    /// Incomplete tasks owned by `owner_id`.
    async fn find_pending_by_owner(&self, owner_id: &str) -> Result<Vec<Task>>;

    /// A single task by id, scoped to its owner.
    async fn find_one(&self, owner_id: &str, id: &str) -> Result<Option<Task>>;

    /// Tasks across all owners whose reminder is owed at `now`.
    async fn find_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Persist a new task.
    async fn insert(&self, task: Task) -> Result<Task>;

    /// Apply `patch` to the owner's task. Returns `None` if no such task.
    async fn update_one(
        &self,
        id: &str,
        owner_id: &str,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>>;

    /// Remove the owner's task. Returns `false` if no such task.
    async fn delete_one(&self, id: &str, owner_id: &str) -> Result<bool>;

    /// Set `reminder_sent` if the task's reminder is still `reminder_at`.
    ///
    /// Returns `false` when the task is gone or its reminder time moved while
    /// the notification was in flight.
    async fn mark_reminder_sent(&self, id: &str, reminder_at: DateTime<Utc>) -> Result<bool>;
}

/// In-process task store.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn find_pending_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.owner_id == owner_id && !t.completed)
            .cloned()
            .collect())
    }

    async fn find_one(&self, owner_id: &str, id: &str) -> Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .find(|t| t.id == id && t.owner_id == owner_id)
            .cloned())
    }

    async fn find_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().filter(|t| t.reminder_due(now)).cloned().collect())
    }

    async fn insert(&self, task: Task) -> Result<Task> {
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update_one(
        &self,
        id: &str,
        owner_id: &str,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner_id)
        else {
            return Ok(None);
        };
        patch.apply(task, now);
        Ok(Some(task.clone()))
    }

    async fn delete_one(&self, id: &str, owner_id: &str) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| !(t.id == id && t.owner_id == owner_id));
        Ok(tasks.len() != before)
    }

    async fn mark_reminder_sent(&self, id: &str, reminder_at: DateTime<Utc>) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) if task.reminder_at == Some(reminder_at) => {
                task.reminder_sent = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
