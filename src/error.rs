//! Error types for the voxtask core.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) accessible
//! via [`TaskError::code()`], plus a spoken fallback used by the voice
//! interface so a failed command never goes silent.

/// Stable error codes for programmatic error handling.
///
/// These codes form part of the HTTP response contract.
pub mod error_codes {
    /// Completion output could not be parsed or violated the intent schema.
    pub const INTERPRETATION_FAILED: &str = "INTERPRETATION_FAILED";

    /// A required field was missing or empty.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

    /// A task reference did not resolve.
    pub const NOT_FOUND: &str = "NOT_FOUND";

    /// A required external credential is absent.
    pub const CONFIGURATION_MISSING: &str = "CONFIGURATION_MISSING";

    /// A notification channel failed after the send attempt.
    pub const DELIVERY_FAILED: &str = "DELIVERY_FAILED";

    /// The completion service rejected the credential.
    pub const CREDENTIAL_REJECTED: &str = "CREDENTIAL_REJECTED";

    /// The completion service failed for a reason other than the credential.
    pub const COMPLETION_FAILED: &str = "COMPLETION_FAILED";

    /// The task store failed.
    pub const STORE_FAILED: &str = "STORE_FAILED";

    /// Invalid configuration file.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Filesystem error.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Spoken fallback when a command could not be understood.
pub const INTERPRETATION_FALLBACK: &str = "Sorry, I couldn't process that command";

/// Top-level error type for the task core.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Completion response unparsable or schema-violating.
    #[error("[{}] {}", error_codes::INTERPRETATION_FAILED, .0)]
    Interpretation(String),

    /// Required field missing (e.g. empty title).
    #[error("[{}] {}", error_codes::VALIDATION_FAILED, .0)]
    Validation(String),

    /// Task reference did not resolve.
    #[error("[{}] {}", error_codes::NOT_FOUND, .0)]
    NotFound(String),

    /// A required external credential is absent.
    #[error("[{}] {}", error_codes::CONFIGURATION_MISSING, .0)]
    Configuration(String),

    /// A notification channel call failed.
    #[error("[{}] {}", error_codes::DELIVERY_FAILED, .0)]
    Delivery(String),

    /// The completion service rejected the API key.
    #[error("[{}] {}", error_codes::CREDENTIAL_REJECTED, .0)]
    Credential(String),

    /// Transport, rate-limit or server failure from the completion service.
    #[error("[{}] {}", error_codes::COMPLETION_FAILED, .0)]
    Completion(String),

    /// Task store failure.
    #[error("[{}] {}", error_codes::STORE_FAILED, .0)]
    Store(String),

    /// Configuration file error.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// I/O error.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl TaskError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Interpretation(_) => error_codes::INTERPRETATION_FAILED,
            Self::Validation(_) => error_codes::VALIDATION_FAILED,
            Self::NotFound(_) => error_codes::NOT_FOUND,
            Self::Configuration(_) => error_codes::CONFIGURATION_MISSING,
            Self::Delivery(_) => error_codes::DELIVERY_FAILED,
            Self::Credential(_) => error_codes::CREDENTIAL_REJECTED,
            Self::Completion(_) => error_codes::COMPLETION_FAILED,
            Self::Store(_) => error_codes::STORE_FAILED,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Interpretation(m)
            | Self::Validation(m)
            | Self::NotFound(m)
            | Self::Configuration(m)
            | Self::Delivery(m)
            | Self::Credential(m)
            | Self::Completion(m)
            | Self::Store(m)
            | Self::Config(m) => m.clone(),
            Self::Io(e) => e.to_string(),
        }
    }

    /// Returns `true` when the completion service rejected the credential,
    /// which is the only error that triggers a key failover.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }

    /// Sentence spoken back to the user when this error ends a voice command.
    pub fn spoken_fallback(&self) -> String {
        match self {
            Self::Interpretation(_) | Self::Completion(_) => INTERPRETATION_FALLBACK.to_owned(),
            Self::Validation(m) => format!("I couldn't do that: {m}"),
            Self::NotFound(m) => format!("I couldn't find that task. {m}"),
            Self::Configuration(m) => format!("That isn't set up yet. {m}"),
            Self::Delivery(_) => "I tried to send it, but the delivery failed.".to_owned(),
            Self::Credential(_) => {
                "Your AI API key was rejected. Please check your keys in settings.".to_owned()
            }
            Self::Store(_) | Self::Config(_) | Self::Io(_) => {
                "Something went wrong on my side. Please try again.".to_owned()
            }
        }
    }

    /// HTTP status used by the gateway for structured (non-voice) callers.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Interpretation(_) => 400,
            Self::Credential(_) => 401,
            Self::NotFound(_) => 404,
            Self::Configuration(_) => 412,
            Self::Delivery(_) | Self::Completion(_) => 502,
            Self::Store(_) | Self::Config(_) | Self::Io(_) => 500,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TaskError>;
