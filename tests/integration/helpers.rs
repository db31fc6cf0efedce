//! Shared fixtures for integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use voxtask::command::{CommandInterpreter, TaskIntentExecutor};
use voxtask::error::{Result, TaskError};
use voxtask::llm::CompletionClient;
use voxtask::notify::{Notification, NotificationChannel, Recipient, ReminderDispatcher};
use voxtask::scheduler::{ManualClock, ReminderScheduler};
use voxtask::tasks::TaskStore;
use voxtask::users::{MemoryUserDirectory, UserDirectory, UserProfile};
use voxtask::VoiceAssistant;

pub(crate) const OWNER: &str = "user-1";

/// Fixed "now" for scenario tests: Sunday 1 June 2025, 08:00 UTC.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

pub(crate) fn profile() -> UserProfile {
    let mut p = UserProfile::new(OWNER, "Ada");
    p.email = Some("ada@example.com".into());
    p.phone = Some("+15550100".into());
    p.whatsapp_api_key = Some("wa-key".into());
    p.credentials.primary = Some("key-a".into());
    p.credentials.secondary = Some("key-b".into());
    p
}

/// Completion client replaying queued replies and rejecting listed keys.
#[derive(Default)]
pub(crate) struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    rejected: Mutex<Vec<String>>,
    keys_used: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub(crate) fn push(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_owned());
    }

    pub(crate) fn reject_key(&self, key: &str) {
        self.rejected.lock().unwrap().push(key.to_owned());
    }

    pub(crate) fn keys_used(&self) -> Vec<String> {
        self.keys_used.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, api_key: &str, _prompt: &str) -> Result<String> {
        self.keys_used.lock().unwrap().push(api_key.to_owned());
        if self.rejected.lock().unwrap().iter().any(|k| k == api_key) {
            return Err(TaskError::Credential(format!("key {api_key} rejected")));
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TaskError::Completion("no scripted reply left".into()))
    }
}

/// Channel that records sends and can be switched to fail.
pub(crate) struct RecordingChannel {
    id: &'static str,
    failing: AtomicBool,
    sent: Mutex<Vec<(Recipient, Notification)>>,
}

impl RecordingChannel {
    pub(crate) fn new(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            failing: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<(Recipient, Notification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn id(&self) -> &'static str {
        self.id
    }

    async fn try_send(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("{} provider unavailable", self.id);
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.clone(), notification.clone()));
        Ok(())
    }
}

/// Everything wired against in-process fakes.
pub(crate) struct Harness {
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) users: Arc<MemoryUserDirectory>,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) completion: Arc<ScriptedCompletion>,
    pub(crate) email: Arc<RecordingChannel>,
    pub(crate) whatsapp: Arc<RecordingChannel>,
    pub(crate) assistant: Arc<VoiceAssistant>,
    pub(crate) scheduler: ReminderScheduler,
}

impl Harness {
    pub(crate) fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_profile(store, profile())
    }

    pub(crate) fn with_profile(store: Arc<dyn TaskStore>, profile: UserProfile) -> Self {
        let users = Arc::new(MemoryUserDirectory::new([profile]));
        let clock = Arc::new(ManualClock::new(t0()));
        let completion = Arc::new(ScriptedCompletion::default());
        let email = RecordingChannel::new("email");
        let whatsapp = RecordingChannel::new("whatsapp");

        let directory: Arc<dyn UserDirectory> = users.clone();
        let executor = TaskIntentExecutor::new(store.clone(), directory.clone(), clock.clone())
            .with_email(email.clone());
        let assistant = Arc::new(VoiceAssistant::new(
            CommandInterpreter::new(completion.clone()),
            executor,
            store.clone(),
            directory.clone(),
        ));
        let dispatcher = ReminderDispatcher::new(Some(email.clone()), Some(whatsapp.clone()));
        let scheduler = ReminderScheduler::new(store.clone(), directory, dispatcher, clock.clone());

        Self {
            store,
            users,
            clock,
            completion,
            email,
            whatsapp,
            assistant,
            scheduler,
        }
    }

    pub(crate) fn in_memory() -> Self {
        Self::new(Arc::new(voxtask::tasks::MemoryTaskStore::new()))
    }

    /// Queue `reply` and run `command` through the assistant.
    pub(crate) async fn say(&self, command: &str, reply: &str) -> voxtask::VoiceResponse {
        self.completion.push(reply);
        self.assistant.handle_command(OWNER, command).await
    }
}
