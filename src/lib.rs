//! voxtask: a personal task service driven by spoken commands.
//!
//! # Architecture
//!
//! - **Command interpretation**: a hosted completion model turns an utterance
//!   into a structured [`command::Intent`], with per-user API-key failover.
//! - **Execution**: [`command::TaskIntentExecutor`] applies the intent to a
//!   [`tasks::TaskStore`] and produces the reply to speak.
//! - **Reminders**: [`scheduler::ReminderScheduler`] polls for due reminders
//!   and delivers them over email and WhatsApp ([`notify`]).
//! - **Gateway**: [`server`] exposes the assistant over HTTP.

pub mod app;
pub mod assistant;
pub mod command;
pub mod config;
pub mod error;
pub mod llm;
pub mod notify;
pub mod scheduler;
pub mod server;
pub mod tasks;
pub mod users;

pub use app::App;
pub use assistant::{VoiceAssistant, VoiceResponse};
pub use config::AppConfig;
pub use error::{Result, TaskError};
