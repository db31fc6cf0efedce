//! Completion service access: client contract, reply parsing and key failover.

pub mod client;
pub mod failover;
pub mod json;

pub use client::{CompletionClient, GeminiClient};
pub use failover::with_failover;
pub use json::{parse_json_reply, strip_code_fences};
