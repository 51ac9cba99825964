use super::{PersistenceError, PersistenceResult, TaskStore, check_version};
use crate::{
    change_set::ChangeSet,
    task::{ProjectId, Task, TaskId},
};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::debug;

pub struct SqliteTaskStore {
    connection: Mutex<Connection>,
}

impl SqliteTaskStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                sort_order INTEGER NOT NULL,
                version INTEGER NOT NULL,
                task_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS tasks_by_project ON tasks (project_id, sort_order);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Version-checked upsert. Runs on the caller's transaction.
    fn write_task(tx: &Transaction<'_>, task: &Task) -> PersistenceResult<()> {
        let json = serde_json::to_string(task)?;
        let id = task.id.to_string();
        let version = i64::try_from(task.version).map_err(|_| {
            PersistenceError::InvalidData(format!("task {} version overflows storage", task.id))
        })?;

        let stored: Option<i64> = tx
            .query_row("SELECT version FROM tasks WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        check_version(stored.map(|v| v as u64), task)?;

        if stored.is_some() {
            tx.execute(
                "UPDATE tasks SET project_id = ?2, sort_order = ?3, version = ?4, task_json = ?5 WHERE id = ?1",
                params![id, task.project_id.to_string(), task.sort_order, version, json],
            )?;
        } else {
            tx.execute(
                "INSERT INTO tasks (id, project_id, sort_order, version, task_json) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, task.project_id.to_string(), task.sort_order, version, json],
            )?;
        }
        debug!(task = %task.id, version = task.version, "task row written");
        Ok(())
    }

    fn remove_task(tx: &Transaction<'_>, id: TaskId) -> PersistenceResult<()> {
        let affected = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        if affected == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(())
    }
}

impl TaskStore for SqliteTaskStore {
    fn load_tasks(&self, project_id: ProjectId) -> PersistenceResult<Vec<Task>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT task_json FROM tasks WHERE project_id = ?1 ORDER BY sort_order ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![project_id.to_string()], |row| row.get::<_, String>(0))?;

        let mut tasks = Vec::new();
        for json in rows {
            let json = json?;
            let task: Task = serde_json::from_str(&json)?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    fn save_task(&self, task: &Task) -> PersistenceResult<()> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        Self::write_task(&tx, task)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> PersistenceResult<()> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        Self::remove_task(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    fn apply_change_set(&self, changes: &ChangeSet) -> PersistenceResult<()> {
        let mut conn = self.connection.lock();
        // Dropping `tx` on an early return rolls every write back.
        let tx = conn.transaction()?;
        for id in &changes.removed {
            Self::remove_task(&tx, *id)?;
        }
        for task in &changes.updated {
            Self::write_task(&tx, task)?;
        }
        tx.commit()?;
        debug!(
            updated = changes.updated.len(),
            removed = changes.removed.len(),
            "change set committed to sqlite"
        );
        Ok(())
    }
}
