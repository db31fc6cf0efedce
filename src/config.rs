//! Configuration types for the task service.

use crate::users::UserProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "VOXTASK_CONFIG";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP gateway settings.
    pub server: ServerConfig,
    /// Completion service (command interpretation) settings.
    pub completion: CompletionConfig,
    /// Transactional email settings.
    pub email: EmailConfig,
    /// WhatsApp gateway settings.
    pub whatsapp: WhatsAppConfig,
    /// Reminder scheduler settings.
    pub reminders: ReminderConfig,
    /// Keep-alive pinger settings.
    pub keepalive: KeepAliveConfig,
    /// Task storage settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Seed user profiles for the in-process user directory.
    pub users: Vec<UserProfile>,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Optional bearer token required on every `/api` request.
    ///
    /// Empty disables the check.
    pub bearer_token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5000,
            bearer_token: String::new(),
        }
    }
}

/// Completion service configuration.
///
/// API keys are per user (see [`crate::users::CredentialPair`]); only the
/// endpoint and model are global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of the generative-language API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            model: "gemini-1.5-flash".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Transactional email configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Base URL of the email API.
    pub api_url: String,
    /// API key. Empty means email delivery is not configured.
    pub api_key: String,
    /// Sender address.
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com".to_owned(),
            api_key: String::new(),
            from_address: "Voxtask <reminders@voxtask.local>".to_owned(),
        }
    }
}

impl EmailConfig {
    /// Returns `true` when an API key is present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// WhatsApp gateway configuration.
///
/// The gateway key is per recipient and lives on the user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Gateway endpoint receiving `phone`, `text` and `apikey` query params.
    pub gateway_url: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://api.callmebot.com/whatsapp.php".to_owned(),
        }
    }
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Whether the scheduler loop runs at all.
    pub enabled: bool,
    /// Seconds between scheduler ticks.
    pub tick_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_secs: 60,
        }
    }
}

impl ReminderConfig {
    /// Tick interval, never shorter than one second.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

/// Keep-alive pinger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// URL to ping. Empty disables the pinger.
    pub url: String,
    /// Seconds between pings.
    pub interval_secs: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            interval_secs: 14 * 60,
        }
    }
}

/// Which task store backend to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store, lost on restart.
    Memory,
    /// SQLite database file.
    #[default]
    Sqlite,
}

/// Task storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection.
    pub backend: StorageBackend,
    /// Database path for the SQLite backend (None = platform data dir).
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database path, falling back to `~/.local/share/voxtask/tasks.db`.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        if let Some(data) = std::env::var_os("XDG_DATA_HOME") {
            PathBuf::from(data).join("voxtask").join("tasks.db")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("voxtask")
                .join("tasks.db")
        } else {
            PathBuf::from("/tmp/voxtask/tasks.db")
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::TaskError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TaskError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the config file path: `$VOXTASK_CONFIG`, else `~/.config/voxtask/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
            PathBuf::from(explicit)
        } else if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("voxtask").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("voxtask")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/voxtask-config/config.toml")
        }
    }

    /// Load from `path` when it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only when an existing file fails to parse.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
