use super::{PersistenceError, PersistenceResult, TaskStore, check_version};
use crate::{
    change_set::ChangeSet,
    task::{ProjectId, Task, TaskId},
};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    rows: Mutex<BTreeMap<TaskId, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl TaskStore for MemoryTaskStore {
    fn load_tasks(&self, project_id: ProjectId) -> PersistenceResult<Vec<Task>> {
        let rows = self.rows.lock();
        let mut tasks: Vec<Task> = rows
            .values()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.sort_order);
        Ok(tasks)
    }

    fn save_task(&self, task: &Task) -> PersistenceResult<()> {
        let mut rows = self.rows.lock();
        check_version(rows.get(&task.id).map(|stored| stored.version), task)?;
        rows.insert(task.id, task.clone());
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> PersistenceResult<()> {
        self.rows
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(PersistenceError::NotFound(id))
    }

    fn apply_change_set(&self, changes: &ChangeSet) -> PersistenceResult<()> {
        let mut rows = self.rows.lock();
        if let Some(missing) = changes.removed.iter().find(|id| !rows.contains_key(*id)) {
            return Err(PersistenceError::NotFound(*missing));
        }
        for task in &changes.updated {
            check_version(rows.get(&task.id).map(|stored| stored.version), task)?;
        }

        for id in &changes.removed {
            rows.remove(id);
        }
        for task in &changes.updated {
            rows.insert(task.id, task.clone());
        }
        Ok(())
    }
}
