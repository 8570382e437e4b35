use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::board::models::{ColumnId, ColumnOrder, NewTask, TaskRecord};

const COLUMN_ORDER_KEY: &str = "column_order";

/// Async-safe handle to the task database.
///
/// Wraps `TaskDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<TaskDb>>,
}

impl DbHandle {
    pub fn new(db: TaskDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&TaskDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct TaskDb {
    conn: Connection,
}

impl TaskDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.run_migrations().context("Failed to run migrations")?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.run_migrations().context("Failed to run migrations")?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    column_index INTEGER NOT NULL DEFAULT 0,
                    row_index INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Task CRUD ─────────────────────────────────────────────────────

    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, description, column_index, row_index
                 FROM tasks ORDER BY rowid",
            )
            .context("Failed to prepare list_tasks")?;
        let rows = stmt
            .query_map([], task_from_row)
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.context("Failed to read task row")?);
        }
        Ok(tasks)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<TaskRecord>> {
        self.conn
            .query_row(
                "SELECT id, title, description, column_index, row_index
                 FROM tasks WHERE id = ?1",
                params![id],
                task_from_row,
            )
            .optional()
            .context("Failed to query task")
    }

    pub fn create_task(&self, task: &NewTask) -> Result<TaskRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO tasks (id, title, description, column_index, row_index, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, task.title, task.description, task.column, task.row, now],
            )
            .context("Failed to insert task")?;
        self.get_task(&id)?.context("Task not found after insert")
    }

    /// Overwrite every field of a task. Returns `false` when the id is unknown.
    pub fn replace_task(&self, task: &TaskRecord) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let count = self
            .conn
            .execute(
                "UPDATE tasks
                 SET title = ?1, description = ?2, column_index = ?3, row_index = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![task.title, task.description, task.column, task.row, now, task.id],
            )
            .context("Failed to update task")?;
        Ok(count > 0)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])
            .context("Failed to delete task")?;
        Ok(count > 0)
    }

    // ── Column order ──────────────────────────────────────────────────

    /// Persisted lane order, or the default order when none was stored.
    pub fn column_order(&self) -> Result<Vec<ColumnId>> {
        let Some(raw) = self.get_setting(COLUMN_ORDER_KEY)? else {
            return Ok(ColumnId::ALL.to_vec());
        };
        let order: ColumnOrder =
            serde_json::from_str(&raw).context("Stored column order is not valid JSON")?;
        order
            .to_columns()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Stored column order is invalid")
    }

    pub fn set_column_order(&self, order: &[ColumnId]) -> Result<()> {
        let raw = serde_json::to_string(&ColumnOrder::from_columns(order))
            .context("Failed to serialize column order")?;
        self.set_setting(COLUMN_ORDER_KEY, &raw)
    }

    // ── Settings ──────────────────────────────────────────────────────

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read setting")
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .context("Failed to write setting")?;
        Ok(())
    }
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        column: row.get(3)?,
        row: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_task(title: &str, column: i32, row: i32) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            column,
            row,
        }
    }

    #[test]
    fn test_create_and_get_task() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        let task = db.create_task(&new_task("Write spec", 0, 0))?;
        assert!(uuid::Uuid::parse_str(&task.id).is_ok());
        assert_eq!(task.title, "Write spec");
        assert_eq!(task.description, None);

        let fetched = db.get_task(&task.id)?.expect("task should exist");
        assert_eq!(fetched, task);
        Ok(())
    }

    #[test]
    fn test_get_missing_task_is_none() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        assert!(db.get_task("nope")?.is_none());
        Ok(())
    }

    #[test]
    fn test_list_tasks_in_insertion_order() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        let a = db.create_task(&new_task("a", 1, 5))?;
        let b = db.create_task(&new_task("b", 1, 0))?;
        let ids: Vec<String> = db.list_tasks()?.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        Ok(())
    }

    #[test]
    fn test_replace_task_overwrites_all_fields() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        let task = db.create_task(&new_task("old", 0, 0))?;
        let updated = TaskRecord {
            title: "new".into(),
            description: Some("desc".into()),
            column: 3,
            row: 2,
            ..task.clone()
        };
        assert!(db.replace_task(&updated)?);
        assert_eq!(db.get_task(&task.id)?, Some(updated));
        Ok(())
    }

    #[test]
    fn test_replace_unknown_task_returns_false() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        let ghost = TaskRecord {
            id: "ghost".into(),
            title: "x".into(),
            description: None,
            column: 0,
            row: 0,
        };
        assert!(!db.replace_task(&ghost)?);
        Ok(())
    }

    #[test]
    fn test_delete_task() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        let task = db.create_task(&new_task("gone", 2, 0))?;
        assert!(db.delete_task(&task.id)?);
        assert!(!db.delete_task(&task.id)?);
        assert!(db.list_tasks()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_column_order_defaults_and_persists() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        assert_eq!(db.column_order()?, ColumnId::ALL.to_vec());
        let order = vec![
            ColumnId::Done,
            ColumnId::Backlog,
            ColumnId::Todo,
            ColumnId::InProgress,
        ];
        db.set_column_order(&order)?;
        assert_eq!(db.column_order()?, order);
        Ok(())
    }

    #[test]
    fn test_set_setting_overwrites_existing() -> Result<()> {
        let db = TaskDb::new_in_memory()?;
        db.set_setting("k", "1")?;
        db.set_setting("k", "2")?;
        assert_eq!(db.get_setting("k")?.as_deref(), Some("2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_db_handle_runs_on_blocking_pool() -> Result<()> {
        let handle = DbHandle::new(TaskDb::new_in_memory()?);
        let created = handle
            .call(|db| db.create_task(&new_task("async", 1, 0)))
            .await?;
        let listed = handle.call(|db| db.list_tasks()).await?;
        assert_eq!(listed, vec![created]);
        Ok(())
    }
}
