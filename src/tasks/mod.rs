//! Task records and storage.

pub mod model;
mod schema;
pub mod sqlite;
pub mod store;

pub use model::{FieldUpdate, NewTask, Task, TaskPatch};
pub use sqlite::SqliteTaskStore;
pub use store::{MemoryTaskStore, TaskStore};
