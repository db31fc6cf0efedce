use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::command::intent::{Intent, RawIntent};
use crate::command::prompt::build_prompt;
use crate::error::{Result, TaskError};
use crate::llm::{CompletionClient, parse_json_reply, with_failover};
use crate::tasks::Task;
use crate::users::CredentialSelector;

/// Turns free-text commands into validated [`Intent`]s using a completion model.
#[derive(Clone)]
pub struct CommandInterpreter {
    client: Arc<dyn CompletionClient>,
}

impl CommandInterpreter {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Interpret one utterance against the user's current tasks.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Validation`] for an empty command.
    /// - [`TaskError::Interpretation`] for an unusable model reply.
    /// - Completion and credential errors after failover.
    pub async fn interpret(
        &self,
        command_text: &str,
        available_tasks: &[Task],
        now: DateTime<Utc>,
        credentials: &CredentialSelector,
    ) -> Result<Intent> {
        if command_text.trim().is_empty() {
            return Err(TaskError::Validation("command is empty".to_owned()));
        }

        let prompt = build_prompt(command_text, available_tasks, now);
        let prompt = prompt.as_str();
        let client = self.client.as_ref();
        let reply = with_failover(credentials, |key| async move {
            client.complete(&key, prompt).await
        })
        .await?;

        debug!(
            user = credentials.user_id(),
            client = self.client.name(),
            reply_len = reply.len(),
            "completion reply received"
        );
        parse_intent(&reply)
    }
}

/// Parse and validate a raw model reply.
///
/// # Errors
///
/// Returns [`TaskError::Interpretation`] or [`TaskError::Validation`].
pub fn parse_intent(reply: &str) -> Result<Intent> {
    let value = parse_json_reply(reply)?;
    RawIntent::from_value(value)?.validate()
}
