//! Wiring of configured components into a runnable service.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::assistant::VoiceAssistant;
use crate::command::{CommandInterpreter, TaskIntentExecutor};
use crate::config::{AppConfig, StorageBackend};
use crate::error::Result;
use crate::llm::{CompletionClient, GeminiClient};
use crate::notify::{EmailChannel, NotificationChannel, ReminderDispatcher, WhatsAppChannel};
use crate::scheduler::{Clock, KeepAlivePinger, ReminderScheduler, SystemClock};
use crate::tasks::{MemoryTaskStore, SqliteTaskStore, TaskStore};
use crate::users::{CredentialStateStore, MemoryUserDirectory, UserDirectory};

/// Fully wired service components.
pub struct App {
    pub store: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserDirectory>,
    pub assistant: Arc<VoiceAssistant>,
    pub scheduler: Option<ReminderScheduler>,
    pub keepalive: Option<KeepAlivePinger>,
}

impl App {
    /// Build everything from configuration with the system clock.
    ///
    /// # Errors
    ///
    /// Store or HTTP client construction failures.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let profiles = config.users.iter().cloned();
        let (store, users): (Arc<dyn TaskStore>, Arc<dyn UserDirectory>) =
            match config.storage.backend {
                StorageBackend::Memory => {
                    let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
                    let users: Arc<dyn UserDirectory> =
                        Arc::new(MemoryUserDirectory::new(profiles));
                    (store, users)
                }
                StorageBackend::Sqlite => {
                    let path = config.storage.resolved_path();
                    info!(path = %path.display(), "opening task database");
                    let sqlite = Arc::new(SqliteTaskStore::open(&path)?);
                    let state: Arc<dyn CredentialStateStore> = sqlite.clone();
                    let users: Arc<dyn UserDirectory> =
                        Arc::new(MemoryUserDirectory::with_credential_state(profiles, state)?);
                    let store: Arc<dyn TaskStore> = sqlite;
                    (store, users)
                }
            };
        let completion: Arc<dyn CompletionClient> = Arc::new(GeminiClient::new(&config.completion)?);
        Self::assemble(config, store, users, completion, Arc::new(SystemClock))
    }

    /// Build from configuration with explicit store, user directory,
    /// completion client and clock.
    ///
    /// # Errors
    ///
    /// HTTP client construction failures.
    pub fn assemble(
        config: &AppConfig,
        store: Arc<dyn TaskStore>,
        users: Arc<dyn UserDirectory>,
        completion: Arc<dyn CompletionClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {

        let email: Option<Arc<dyn NotificationChannel>> = if config.email.is_configured() {
            let channel: Arc<dyn NotificationChannel> = Arc::new(EmailChannel::new(&config.email)?);
            Some(channel)
        } else {
            info!("email API key not set; reports and email reminders are disabled");
            None
        };
        let whatsapp: Arc<dyn NotificationChannel> =
            Arc::new(WhatsAppChannel::new(&config.whatsapp)?);

        let mut executor =
            TaskIntentExecutor::new(Arc::clone(&store), Arc::clone(&users), Arc::clone(&clock));
        if let Some(channel) = &email {
            executor = executor.with_email(Arc::clone(channel));
        }
        let assistant = Arc::new(VoiceAssistant::new(
            CommandInterpreter::new(completion),
            executor,
            Arc::clone(&store),
            Arc::clone(&users),
        ));

        let scheduler = config.reminders.enabled.then(|| {
            ReminderScheduler::new(
                Arc::clone(&store),
                Arc::clone(&users),
                ReminderDispatcher::new(email.clone(), Some(whatsapp)),
                clock,
            )
            .with_interval(config.reminders.tick_interval())
        });
        let keepalive = KeepAlivePinger::from_config(&config.keepalive)?;

        Ok(Self {
            store,
            users,
            assistant,
            scheduler,
            keepalive,
        })
    }

    /// Spawn the reminder scheduler and keep-alive loops.
    pub fn spawn_background(&mut self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if let Some(scheduler) = self.scheduler.take() {
            handles.push(scheduler.run(cancel.child_token()));
        }
        if let Some(pinger) = self.keepalive.take() {
            handles.push(pinger.run(cancel.child_token()));
        }
        handles
    }
}
