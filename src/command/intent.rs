//! Structured intents and validation of raw model output.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, TaskError};
use crate::tasks::{FieldUpdate, NewTask, TaskPatch};

/// Reference to an existing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRef {
    Id(String),
    /// Case-insensitive substring of the title.
    Title(String),
}

impl std::fmt::Display for TaskRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Title(title) => write!(f, "\"{title}\""),
        }
    }
}

/// A validated task operation.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentAction {
    Create(NewTask),
    List,
    Update { target: TaskRef, patch: TaskPatch },
    Complete { target: TaskRef },
    Delete { target: TaskRef },
    SendReport,
}

impl IntentAction {
    /// Wire name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::List => "list",
            Self::Update { .. } => "update",
            Self::Complete { .. } => "complete",
            Self::Delete { .. } => "delete",
            Self::SendReport => "sendReport",
        }
    }
}

/// Interpreted command.
///
/// The model's own `response` text is not kept: confirmations are rendered
/// from what the executor actually stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: IntentAction,
}

impl Intent {
    pub fn new(action: IntentAction) -> Self {
        Self { action }
    }
}

/// Task fields as the model emits them. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTaskFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub reminder_time: Option<String>,
}

/// Model reply before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIntent {
    pub action: Option<String>,
    pub task: Option<RawTaskFields>,
    /// Models sometimes emit ids as numbers.
    pub task_id: Option<serde_json::Value>,
    pub update_fields: Option<RawTaskFields>,
}

impl RawIntent {
    /// Decode a JSON value into a raw intent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Interpretation`] when the shape does not match.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| TaskError::Interpretation(format!("unexpected intent shape: {e}")))
    }

    /// Check the raw reply and turn it into an [`Intent`].
    ///
    /// # Errors
    ///
    /// - [`TaskError::Interpretation`] for an unknown action or bad timestamp.
    /// - [`TaskError::Validation`] when an update/complete/delete names no task.
    pub fn validate(self) -> Result<Intent> {
        let action_name = self
            .action
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| TaskError::Interpretation("model reply has no action".to_owned()))?;

        let action = match action_name.to_ascii_lowercase().as_str() {
            "create" => IntentAction::Create(new_task(self.task.as_ref())?),
            "list" => IntentAction::List,
            "update" => IntentAction::Update {
                target: target(self.task_id.as_ref(), self.task.as_ref())?,
                patch: patch(self.update_fields.as_ref())?,
            },
            "complete" => IntentAction::Complete {
                target: target(self.task_id.as_ref(), self.task.as_ref())?,
            },
            "delete" => IntentAction::Delete {
                target: target(self.task_id.as_ref(), self.task.as_ref())?,
            },
            "sendemail" | "sendreport" | "report" => IntentAction::SendReport,
            other => {
                return Err(TaskError::Interpretation(format!("unknown action '{other}'")));
            }
        };

        Ok(Intent::new(action))
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn new_task(fields: Option<&RawTaskFields>) -> Result<NewTask> {
    let Some(fields) = fields else {
        return Ok(NewTask::default());
    };
    Ok(NewTask {
        title: fields.title.clone().unwrap_or_default(),
        description: non_blank(fields.description.as_ref()),
        due_at: parse_timestamp("dueDate", fields.due_date.as_deref())?,
        reminder_at: parse_timestamp("reminderTime", fields.reminder_time.as_deref())?,
    })
}

fn patch(fields: Option<&RawTaskFields>) -> Result<TaskPatch> {
    let Some(fields) = fields else {
        return Ok(TaskPatch::default());
    };
    let description = match fields.description.as_deref().map(str::trim) {
        None => FieldUpdate::Keep,
        Some("") => FieldUpdate::Clear,
        Some(text) => FieldUpdate::Set(text.to_owned()),
    };
    Ok(TaskPatch {
        title: non_blank(fields.title.as_ref()),
        description,
        due_at: parse_timestamp("dueDate", fields.due_date.as_deref())?,
        reminder_at: parse_timestamp("reminderTime", fields.reminder_time.as_deref())?,
        completed: None,
    })
}

fn target(task_id: Option<&serde_json::Value>, task: Option<&RawTaskFields>) -> Result<TaskRef> {
    let id = match task_id {
        Some(serde_json::Value::String(s)) => Some(s.trim().to_owned()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    if let Some(id) = id.filter(|id| !is_unspecified(id)) {
        return Ok(TaskRef::Id(id));
    }
    if let Some(title) = task.and_then(|t| non_blank(t.title.as_ref())) {
        return Ok(TaskRef::Title(title));
    }
    Err(TaskError::Validation(
        "which task? no task id or title was given".to_owned(),
    ))
}

/// Models fill absent string fields with blanks or placeholder words.
fn is_unspecified(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty()
        || ["null", "none", "undefined"]
            .iter()
            .any(|word| raw.eq_ignore_ascii_case(word))
}

/// Parse an ISO-8601 timestamp. Blank and placeholder values (`"null"`,
/// `"none"`) mean not specified; values without an offset are taken as UTC.
///
/// # Errors
///
/// Returns [`TaskError::Interpretation`] naming the field for unparsable input.
pub fn parse_timestamp(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|r| !is_unspecified(r)) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Some(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(Some(midnight.and_utc()));
    }

    Err(TaskError::Interpretation(format!(
        "{field} '{raw}' is not an ISO-8601 timestamp"
    )))
}
