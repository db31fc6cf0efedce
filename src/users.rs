//! User profiles and per-user completion credential selection.
//!
//! Profile CRUD lives outside this crate; [`UserDirectory`] is the narrow
//! read/write surface the core needs: contact details for notifications and
//! the active-credential marker for key failover.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Result, TaskError};

/// Which of the two completion API keys is in use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSlot {
    #[default]
    Primary,
    Secondary,
}

impl CredentialSlot {
    /// The other slot.
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }

    fn from_u8(raw: u8) -> Self {
        if raw == 0 {
            Self::Primary
        } else {
            Self::Secondary
        }
    }

    /// Parse the lowercase name written by `Display`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

impl std::fmt::Display for CredentialSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// A user's two completion API keys and the active marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialPair {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub active: CredentialSlot,
}

impl CredentialPair {
    /// Key stored in `slot`, ignoring blank values.
    pub fn key(&self, slot: CredentialSlot) -> Option<&str> {
        let key = match slot {
            CredentialSlot::Primary => self.primary.as_deref(),
            CredentialSlot::Secondary => self.secondary.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Profile data the core reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    /// Phone number for WhatsApp reminders (international format).
    pub phone: Option<String>,
    /// Per-recipient key issued by the WhatsApp gateway.
    pub whatsapp_api_key: Option<String>,
    #[serde(default = "default_true")]
    pub email_reminders: bool,
    pub whatsapp_reminders: bool,
    pub credentials: CredentialPair,
}

fn default_true() -> bool {
    true
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email_reminders: true,
            ..Self::default()
        }
    }

    /// First name used to greet the user in notifications.
    pub fn greeting_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }
}

/// Read/write access to user profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Persist the active credential marker.
    async fn set_active_credential(&self, user_id: &str, slot: CredentialSlot) -> Result<()>;
}

/// Durable record of each user's active credential slot.
///
/// Profiles come from configuration, so without this a key switch is
/// forgotten on restart and the rejected key is tried again.
pub trait CredentialStateStore: Send + Sync {
    fn load_active_slots(&self) -> Result<Vec<(String, CredentialSlot)>>;

    fn save_active_slot(&self, user_id: &str, slot: CredentialSlot) -> Result<()>;
}

/// In-process user directory, seeded from configuration.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, UserProfile>>,
    state: Option<Arc<dyn CredentialStateStore>>,
}

impl std::fmt::Debug for MemoryUserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryUserDirectory")
            .field("persistent", &self.state.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoryUserDirectory {
    pub fn new(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            users: RwLock::new(profiles.into_iter().map(|p| (p.id.clone(), p)).collect()),
            state: None,
        }
    }

    /// Seed from `profiles`, then apply the active slots saved in `state`.
    /// Later switches are written back to `state`.
    ///
    /// # Errors
    ///
    /// Returns the state store's error if saved slots cannot be read.
    pub fn with_credential_state(
        profiles: impl IntoIterator<Item = UserProfile>,
        state: Arc<dyn CredentialStateStore>,
    ) -> Result<Self> {
        let mut users: HashMap<String, UserProfile> =
            profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        for (user_id, slot) in state.load_active_slots()? {
            if let Some(profile) = users.get_mut(&user_id) {
                profile.credentials.active = slot;
            }
        }
        Ok(Self {
            users: RwLock::new(users),
            state: Some(state),
        })
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn set_active_credential(&self, user_id: &str, slot: CredentialSlot) -> Result<()> {
        let mut users = self.users.write().await;
        let profile = users
            .get_mut(user_id)
            .ok_or_else(|| TaskError::NotFound(format!("no user profile for {user_id}")))?;
        profile.credentials.active = slot;
        drop(users);
        if let Some(state) = &self.state {
            state.save_active_slot(user_id, slot)?;
        }
        Ok(())
    }
}

/// Per-user credential selection passed explicitly through a command call.
///
/// The active slot is swapped with compare-and-swap so that two concurrent
/// failures on the same key produce a single switch.
pub struct CredentialSelector {
    user_id: String,
    credentials: CredentialPair,
    active: AtomicU8,
    directory: Arc<dyn UserDirectory>,
}

impl std::fmt::Debug for CredentialSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSelector")
            .field("user_id", &self.user_id)
            .field("active", &self.active_slot())
            .finish_non_exhaustive()
    }
}

impl CredentialSelector {
    pub fn new(profile: &UserProfile, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            user_id: profile.id.clone(),
            credentials: profile.credentials.clone(),
            active: AtomicU8::new(profile.credentials.active.as_u8()),
            directory,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn active_slot(&self) -> CredentialSlot {
        CredentialSlot::from_u8(self.active.load(Ordering::Acquire))
    }

    pub fn key(&self, slot: CredentialSlot) -> Option<&str> {
        self.credentials.key(slot)
    }

    /// Key for the active slot.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Configuration`] when the user has no key at all.
    pub fn active_key(&self) -> Result<(CredentialSlot, &str)> {
        let slot = self.active_slot();
        if let Some(key) = self.key(slot) {
            return Ok((slot, key));
        }
        // Active slot empty but the other one is set: use it without switching.
        let other = slot.other();
        self.key(other).map(|key| (other, key)).ok_or_else(|| {
            TaskError::Configuration(
                "no AI API key configured; add one in your profile settings".to_owned(),
            )
        })
    }

    /// Move the active marker away from `failed` and persist the change.
    ///
    /// Returns the slot that is active afterwards. If another call already
    /// switched away from `failed`, nothing is written.
    pub async fn switch_from(&self, failed: CredentialSlot) -> Result<CredentialSlot> {
        let next = failed.other();
        match self.active.compare_exchange(
            failed.as_u8(),
            next.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                info!(user = %self.user_id, from = %failed, to = %next, "switched completion credential");
                self.directory
                    .set_active_credential(&self.user_id, next)
                    .await?;
                Ok(next)
            }
            Err(current) => Ok(CredentialSlot::from_u8(current)),
        }
    }
}
