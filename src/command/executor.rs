//! Applies validated intents to the task store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::command::intent::{Intent, IntentAction, TaskRef};
use crate::command::report::render_report;
use crate::error::{Result, TaskError};
use crate::notify::{NotificationChannel, Recipient};
use crate::scheduler::clock::Clock;
use crate::tasks::{NewTask, Task, TaskPatch, TaskStore};
use crate::users::UserDirectory;

/// Reply for the user plus the data touched by the operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Wire name of the executed action.
    pub action: &'static str,
    pub response_text: String,
    /// Created, updated, completed or deleted task.
    pub task: Option<Task>,
    /// Listed or reported tasks.
    pub tasks: Vec<Task>,
}

impl ExecutionResult {
    fn with_task(action: &'static str, response_text: String, task: Task) -> Self {
        Self {
            action,
            response_text,
            task: Some(task),
            tasks: Vec::new(),
        }
    }
}

/// Executes intents on behalf of a task owner.
#[derive(Clone)]
pub struct TaskIntentExecutor {
    store: Arc<dyn TaskStore>,
    users: Arc<dyn UserDirectory>,
    email: Option<Arc<dyn NotificationChannel>>,
    clock: Arc<dyn Clock>,
}

impl TaskIntentExecutor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            users,
            email: None,
            clock,
        }
    }

    /// Enable `sendReport` through `channel`.
    #[must_use]
    pub fn with_email(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.email = Some(channel);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `intent` for `owner_id`.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Validation`] for a create without a title.
    /// - [`TaskError::NotFound`] when the referenced task does not resolve.
    /// - [`TaskError::Configuration`] / [`TaskError::Delivery`] for reports.
    /// - Store errors.
    pub async fn execute(&self, intent: Intent, owner_id: &str) -> Result<ExecutionResult> {
        match intent.action {
            IntentAction::Create(new) => self.create(new, owner_id).await,
            IntentAction::List => self.list(owner_id).await,
            IntentAction::Update { target, patch } => self.update(&target, &patch, owner_id).await,
            IntentAction::Complete { target } => self.complete(&target, owner_id).await,
            IntentAction::Delete { target } => self.delete(&target, owner_id).await,
            IntentAction::SendReport => self.send_report(owner_id).await,
        }
    }

    async fn create(&self, new: NewTask, owner_id: &str) -> Result<ExecutionResult> {
        if new.title.trim().is_empty() {
            return Err(TaskError::Validation("a task needs a title".to_owned()));
        }
        let task = self.store.insert(new.into_task(owner_id, self.now())).await?;
        info!(task_id = %task.id, owner = owner_id, "task created");

        let mut text = format!("Added \"{}\" to your tasks.", task.title);
        if let Some(due) = task.due_at {
            text.push_str(&format!(" It's due {}.", due.format("%a %d %b at %H:%M UTC")));
        }
        Ok(ExecutionResult::with_task("create", text, task))
    }

    async fn list(&self, owner_id: &str) -> Result<ExecutionResult> {
        let tasks = self.store.find_pending_by_owner(owner_id).await?;
        let response_text = match tasks.len() {
            0 => "You have no pending tasks.".to_owned(),
            n => {
                let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
                let noun = if n == 1 { "task" } else { "tasks" };
                format!("You have {n} pending {noun}: {}.", titles.join(", "))
            }
        };
        Ok(ExecutionResult {
            action: "list",
            response_text,
            task: None,
            tasks,
        })
    }

    async fn update(
        &self,
        target: &TaskRef,
        patch: &TaskPatch,
        owner_id: &str,
    ) -> Result<ExecutionResult> {
        let task = self.resolve(target, owner_id).await?;
        let updated = self.apply(&task, patch, owner_id).await?;
        info!(task_id = %updated.id, owner = owner_id, "task updated");
        let text = format!("Updated \"{}\".", updated.title);
        Ok(ExecutionResult::with_task("update", text, updated))
    }

    async fn complete(&self, target: &TaskRef, owner_id: &str) -> Result<ExecutionResult> {
        let task = self.resolve(target, owner_id).await?;
        let updated = self.apply(&task, &TaskPatch::complete(), owner_id).await?;
        info!(task_id = %updated.id, owner = owner_id, "task completed");
        let text = format!("Marked \"{}\" as complete.", updated.title);
        Ok(ExecutionResult::with_task("complete", text, updated))
    }

    async fn delete(&self, target: &TaskRef, owner_id: &str) -> Result<ExecutionResult> {
        let task = self.resolve(target, owner_id).await?;
        if !self.store.delete_one(&task.id, owner_id).await? {
            return Err(TaskError::NotFound(format!("task {} no longer exists", task.id)));
        }
        info!(task_id = %task.id, owner = owner_id, "task deleted");
        let text = format!("Deleted \"{}\".", task.title);
        Ok(ExecutionResult::with_task("delete", text, task))
    }

    async fn apply(&self, task: &Task, patch: &TaskPatch, owner_id: &str) -> Result<Task> {
        self.store
            .update_one(&task.id, owner_id, patch, self.now())
            .await?
            .ok_or_else(|| TaskError::NotFound(format!("task {} no longer exists", task.id)))
    }

    async fn send_report(&self, owner_id: &str) -> Result<ExecutionResult> {
        let channel = self.email.as_ref().ok_or_else(|| {
            TaskError::Configuration("email delivery is not configured".to_owned())
        })?;
        let profile = self
            .users
            .profile(owner_id)
            .await?
            .ok_or_else(|| TaskError::NotFound(format!("no user profile for {owner_id}")))?;
        let address = profile
            .email
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                TaskError::Configuration("there is no email address on your profile".to_owned())
            })?
            .to_owned();

        let tasks = self.store.find_by_owner(owner_id).await?;
        let report = render_report(profile.greeting_name(), &tasks, self.now());
        if !channel.send(&Recipient::email(&address), &report).await {
            return Err(TaskError::Delivery(format!(
                "the report email to {address} was not accepted"
            )));
        }

        info!(owner = owner_id, tasks = tasks.len(), "task report sent");
        Ok(ExecutionResult {
            action: "sendReport",
            response_text: format!("I've emailed your task report to {address}."),
            task: None,
            tasks,
        })
    }

    /// Resolve a reference to one of the owner's tasks.
    ///
    /// Titles match case-insensitively as a substring, scanning in store order.
    /// When several tasks match, the first is used and the ambiguity is logged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] naming the reference when nothing matches.
    pub async fn resolve(&self, target: &TaskRef, owner_id: &str) -> Result<Task> {
        match target {
            TaskRef::Id(id) => self
                .store
                .find_one(owner_id, id)
                .await?
                .ok_or_else(|| TaskError::NotFound(format!("no task with {target}"))),
            TaskRef::Title(title) => {
                let needle = title.trim().to_lowercase();
                let mut matches: Vec<Task> = self
                    .store
                    .find_by_owner(owner_id)
                    .await?
                    .into_iter()
                    .filter(|t| t.title.to_lowercase().contains(&needle))
                    .collect();
                if matches.len() > 1 {
                    let candidates: Vec<&str> = matches.iter().map(|t| t.id.as_str()).collect();
                    warn!(
                        owner = owner_id,
                        reference = %title,
                        ?candidates,
                        "ambiguous task title, using the first match"
                    );
                }
                if matches.is_empty() {
                    return Err(TaskError::NotFound(format!("no task matching {target}")));
                }
                Ok(matches.swap_remove(0))
            }
        }
    }
}
