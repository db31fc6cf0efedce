//! Voice command handling: prompt, interpretation, validation and execution.

pub mod executor;
pub mod intent;
pub mod interpreter;
pub mod prompt;
pub mod report;

pub use executor::{ExecutionResult, TaskIntentExecutor};
pub use intent::{Intent, IntentAction, RawIntent, TaskRef};
pub use interpreter::{CommandInterpreter, parse_intent};
pub use report::render_report;
