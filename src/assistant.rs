//! Voice command entry point.
//!
//! [`VoiceAssistant::handle_command`] runs interpret → execute for one
//! utterance and is the error boundary for voice callers: every outcome,
//! including failures, becomes a [`VoiceResponse`] with something to speak.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::command::{CommandInterpreter, ExecutionResult, Intent, IntentAction, TaskIntentExecutor};
use crate::error::{Result, TaskError};
use crate::tasks::{Task, TaskStore};
use crate::users::{CredentialSelector, UserDirectory};

/// Structured error carried in a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&TaskError> for ErrorBody {
    fn from(err: &TaskError) -> Self {
        Self {
            code: err.code().to_owned(),
            message: err.message(),
        }
    }
}

/// Reply to a voice command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Text to speak back to the user.
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl VoiceResponse {
    fn success(result: ExecutionResult) -> Self {
        Self {
            success: true,
            action: Some(result.action.to_owned()),
            response: result.response_text,
            task: result.task,
            tasks: result.tasks,
            error: None,
        }
    }

    pub(crate) fn failure(err: &TaskError) -> Self {
        Self {
            success: false,
            action: None,
            response: err.spoken_fallback(),
            task: None,
            tasks: Vec::new(),
            error: Some(ErrorBody::from(err)),
        }
    }
}

/// Ties the interpreter and executor to the user directory and task store.
#[derive(Clone)]
pub struct VoiceAssistant {
    interpreter: CommandInterpreter,
    executor: TaskIntentExecutor,
    store: Arc<dyn TaskStore>,
    users: Arc<dyn UserDirectory>,
}

impl VoiceAssistant {
    pub fn new(
        interpreter: CommandInterpreter,
        executor: TaskIntentExecutor,
        store: Arc<dyn TaskStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            interpreter,
            executor,
            store,
            users,
        }
    }

    /// Handle one utterance for `user_id`. Never fails.
    pub async fn handle_command(&self, user_id: &str, command: &str) -> VoiceResponse {
        match self.run_command(user_id, command).await {
            Ok(result) => {
                info!(user = user_id, action = result.action, "voice command handled");
                VoiceResponse::success(result)
            }
            Err(e) => {
                warn!(user = user_id, code = e.code(), "voice command failed: {e}");
                VoiceResponse::failure(&e)
            }
        }
    }

    async fn run_command(&self, user_id: &str, command: &str) -> Result<ExecutionResult> {
        let profile = self
            .users
            .profile(user_id)
            .await?
            .ok_or_else(|| TaskError::NotFound(format!("no user profile for {user_id}")))?;
        let credentials = CredentialSelector::new(&profile, Arc::clone(&self.users));

        let available = self.store.find_by_owner(user_id).await?;
        let intent = self
            .interpreter
            .interpret(command, &available, self.executor.now(), &credentials)
            .await?;
        self.executor.execute(intent, user_id).await
    }

    /// All tasks owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        self.store.find_by_owner(user_id).await
    }

    /// Email the task report without going through the model.
    ///
    /// # Errors
    ///
    /// Same as the `sendReport` intent.
    pub async fn send_report(&self, user_id: &str) -> Result<ExecutionResult> {
        self.executor
            .execute(Intent::new(IntentAction::SendReport), user_id)
            .await
    }
}
