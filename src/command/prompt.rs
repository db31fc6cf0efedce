use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::tasks::Task;

/// Output contract given to the model.
const OUTPUT_SCHEMA: &str = r#"{
  "action": "create" | "list" | "update" | "complete" | "delete" | "sendEmail",
  "task": {
    "title": string,
    "description": string | null,
    "dueDate": ISO-8601 string | null,
    "reminderTime": ISO-8601 string | null
  } | null,
  "taskId": string | null,
  "updateFields": {
    "title": string | null,
    "description": string | null,
    "dueDate": ISO-8601 string | null,
    "reminderTime": ISO-8601 string | null
  } | null,
  "response": string
}"#;

/// Task summary shown to the model.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptTask<'a> {
    id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    due_date: Option<String>,
    reminder_time: Option<String>,
    completed: bool,
}

impl<'a> From<&'a Task> for PromptTask<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: &task.id,
            title: &task.title,
            description: task.description.as_deref(),
            due_date: task.due_at.map(rfc3339),
            reminder_time: task.reminder_at.map(rfc3339),
            completed: task.completed,
        }
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the interpretation prompt for one utterance.
pub fn build_prompt(command: &str, tasks: &[Task], now: DateTime<Utc>) -> String {
    let summaries: Vec<PromptTask<'_>> = tasks.iter().map(PromptTask::from).collect();
    let task_json = serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_owned());

    format!(
        "You are a task management assistant. Turn the user's spoken command into one \
structured action.

Current date and time (UTC): {now}

The user's existing tasks:
{task_json}

User command: \"{command}\"

Rules:
- Reply with a single JSON object and nothing else.
- Use \"create\" to add a task, \"list\" to read out pending tasks, \"update\" to change \
fields, \"complete\" to mark a task done, \"delete\" to remove one, and \"sendEmail\" to \
email a task report.
- For update, complete and delete, set \"taskId\" to the id of the matching existing task \
when you can identify it; otherwise put the spoken title in \"task.title\".
- Resolve relative dates and times (\"tomorrow at 5pm\") against the current time and \
write them as ISO-8601 in UTC.
- In \"updateFields\", include only the fields the user asked to change. Use an empty \
string for \"description\" to clear it.
- \"response\" is a short, friendly sentence to speak back to the user.

Respond with JSON in exactly this shape:
{OUTPUT_SCHEMA}",
        now = rfc3339(now),
        command = command.trim(),
    )
}
