use crate::{
    calendar::WorkCalendar,
    change_set::ChangeSet,
    error::ScheduleError,
    metadata::ProjectMetadata,
    schedule::Schedule,
    task::{ProjectId, Task, TaskId},
};
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("task {0} is not stored")]
    NotFound(TaskId),
    #[error("task {task} was changed by someone else (stored version {stored}, incoming {incoming})")]
    Conflict {
        task: TaskId,
        stored: u64,
        incoming: u64,
    },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Row-level storage for tasks. Writes carry the task's version stamp and are
/// refused when the stored row is not the immediate predecessor of it.
pub trait TaskStore: Send + Sync {
    /// Tasks of one project, ordered by `sort_order`.
    fn load_tasks(&self, project_id: ProjectId) -> PersistenceResult<Vec<Task>>;
    fn save_task(&self, task: &Task) -> PersistenceResult<()>;
    fn delete_task(&self, id: TaskId) -> PersistenceResult<()>;
    /// Write a whole change set or nothing: every removed row must exist and
    /// every updated row must pass its version check before any row changes.
    fn apply_change_set(&self, changes: &ChangeSet) -> PersistenceResult<()>;
}

/// Decide whether `incoming` may replace the row currently at version `stored`.
pub(crate) fn check_version(stored: Option<u64>, incoming: &Task) -> PersistenceResult<()> {
    match stored {
        None if incoming.version == 1 => Ok(()),
        None => Err(PersistenceError::NotFound(incoming.id)),
        Some(stored) if stored + 1 == incoming.version => Ok(()),
        Some(stored) => Err(PersistenceError::Conflict {
            task: incoming.id,
            stored,
            incoming: incoming.version,
        }),
    }
}

/// Write what a committed engine operation changed.
pub fn persist_change_set(store: &dyn TaskStore, changes: &ChangeSet) -> PersistenceResult<()> {
    if changes.is_empty() {
        return Ok(());
    }
    store.apply_change_set(changes)
}

/// Rebuild a project's schedule from a store. Tasks whose dates move under
/// `calendar` are written back with a bumped version so the store and the
/// returned schedule agree.
pub fn load_schedule(
    store: &dyn TaskStore,
    metadata: ProjectMetadata,
    calendar: WorkCalendar,
) -> PersistenceResult<Schedule> {
    let tasks = store.load_tasks(metadata.project_id)?;
    info!(project = %metadata.project_id, tasks = tasks.len(), "loaded tasks from store");
    let (schedule, reprojected) = Schedule::reproject(metadata, calendar, tasks)?;
    if !reprojected.is_empty() {
        info!(
            project = %schedule.project_id(),
            tasks = reprojected.updated.len(),
            "writing back tasks re-derived from the calendar"
        );
        store.apply_change_set(&reprojected)?;
    }
    Ok(schedule)
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv, save_schedule_to_json,
};
pub use memory::MemoryTaskStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTaskStore;
