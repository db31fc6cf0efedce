//! SQLite-backed task store.
//!
//! Implements [`TaskStore`] on a single database file. All statements run
//! under one `Mutex<Connection>`, which gives each single-task mutation the
//! atomicity the core relies on.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::warn;

use super::model::{Task, TaskPatch};
use super::schema::{apply_schema, read_schema_version};
use super::store::TaskStore;
use crate::error::{Result, TaskError};
use crate::users::{CredentialSlot, CredentialStateStore};

const TASK_COLUMNS: &str = "id, owner_id, title, description, due_at, reminder_at, \
     completed, reminder_sent, created_at, updated_at";

/// SQLite-backed task store.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        apply_schema(&conn).map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        apply_schema(&conn).map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read the current schema version from the database.
    pub fn schema_version(&self) -> Result<Option<u32>> {
        let conn = self.lock()?;
        read_schema_version(&conn).map_err(store_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TaskError::Store(format!("task store lock poisoned: {e}")))
    }

    fn query_tasks(
        conn: &Connection,
        where_clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE {where_clause} ORDER BY rowid");
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt.query_map(params, row_to_task).map_err(store_err)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_err(store_err)?);
        }
        Ok(tasks)
    }

    fn fetch(conn: &Connection, owner_id: &str, id: &str) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2");
        conn.query_row(&sql, params![id, owner_id], row_to_task)
            .optional()
            .map_err(store_err)
    }
}

impl CredentialStateStore for SqliteTaskStore {
    fn load_active_slots(&self) -> Result<Vec<(String, CredentialSlot)>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT user_id, active_slot FROM credential_state")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(store_err)?;

        let mut slots = Vec::new();
        for row in rows {
            let (user_id, raw) = row.map_err(store_err)?;
            match CredentialSlot::parse(&raw) {
                Some(slot) => slots.push((user_id, slot)),
                None => warn!(user = %user_id, slot = %raw, "ignoring unknown credential slot"),
            }
        }
        Ok(slots)
    }

    fn save_active_slot(&self, user_id: &str, slot: CredentialSlot) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO credential_state (user_id, active_slot, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(user_id) DO UPDATE SET \
             active_slot = excluded.active_slot, updated_at = excluded.updated_at",
            params![user_id, slot.to_string(), fmt_ts(&Utc::now())],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        Self::query_tasks(&conn, "owner_id = ?1", params![owner_id])
    }

    async fn find_pending_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        Self::query_tasks(&conn, "owner_id = ?1 AND completed = 0", params![owner_id])
    }

    async fn find_one(&self, owner_id: &str, id: &str) -> Result<Option<Task>> {
        let conn = self.lock()?;
        Self::fetch(&conn, owner_id, id)
    }

    async fn find_due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        Self::query_tasks(
            &conn,
            "reminder_at IS NOT NULL AND reminder_at <= ?1 \
             AND reminder_sent = 0 AND completed = 0",
            params![fmt_ts(&now)],
        )
    }

    async fn insert(&self, task: Task) -> Result<Task> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                task.id,
                task.owner_id,
                task.title,
                task.description,
                task.due_at.as_ref().map(fmt_ts),
                task.reminder_at.as_ref().map(fmt_ts),
                task.completed,
                task.reminder_sent,
                fmt_ts(&task.created_at),
                fmt_ts(&task.updated_at),
            ],
        )
        .map_err(store_err)?;
        Ok(task)
    }

    async fn update_one(
        &self,
        id: &str,
        owner_id: &str,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>> {
        let conn = self.lock()?;
        let Some(mut task) = Self::fetch(&conn, owner_id, id)? else {
            return Ok(None);
        };
        patch.apply(&mut task, now);

        conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, due_at = ?3, reminder_at = ?4, \
             completed = ?5, reminder_sent = ?6, updated_at = ?7 \
             WHERE id = ?8 AND owner_id = ?9",
            params![
                task.title,
                task.description,
                task.due_at.as_ref().map(fmt_ts),
                task.reminder_at.as_ref().map(fmt_ts),
                task.completed,
                task.reminder_sent,
                fmt_ts(&task.updated_at),
                task.id,
                task.owner_id,
            ],
        )
        .map_err(store_err)?;
        Ok(Some(task))
    }

    async fn delete_one(&self, id: &str, owner_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    async fn mark_reminder_sent(&self, id: &str, reminder_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE tasks SET reminder_sent = 1 WHERE id = ?1 AND reminder_at = ?2",
                params![id, fmt_ts(&reminder_at)],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }
}

fn store_err(e: rusqlite::Error) -> TaskError {
    TaskError::Store(e.to_string())
}

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let created: String = row.get(8)?;
    let updated: String = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        due_at: parse_opt_ts(4, row.get(4)?)?,
        reminder_at: parse_opt_ts(5, row.get(5)?)?,
        completed: row.get(6)?,
        reminder_sent: row.get(7)?,
        created_at: parse_ts(8, &created)?,
        updated_at: parse_ts(9, &updated)?,
    })
}
