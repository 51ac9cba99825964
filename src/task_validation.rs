use crate::error::{ScheduleError, ScheduleResult};
use crate::task::Task;
use std::collections::HashSet;

/// Longest task the engine will place, in working days (roughly 14 years).
pub const MAX_DURATION_DAYS: u32 = 3650;

pub fn validate_name(name: &str) -> ScheduleResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ScheduleError::invalid("task name must not be blank"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_duration(duration_days: u32) -> ScheduleResult<()> {
    if duration_days == 0 {
        return Err(ScheduleError::invalid(
            "duration must be at least one working day",
        ));
    }
    if duration_days > MAX_DURATION_DAYS {
        return Err(ScheduleError::invalid(format!(
            "duration {duration_days} exceeds the maximum of {MAX_DURATION_DAYS} working days"
        )));
    }
    Ok(())
}

pub fn validate_task(task: &Task) -> ScheduleResult<()> {
    validate_name(&task.name)?;
    validate_duration(task.duration_days)?;

    if task.end_date < task.start_date {
        return Err(ScheduleError::invalid(format!(
            "task {} ends {} before it starts {}",
            task.id, task.end_date, task.start_date
        )));
    }

    let mut seen = HashSet::with_capacity(task.dependencies.len());
    for dependency in &task.dependencies {
        if *dependency == task.id {
            return Err(ScheduleError::invalid(format!(
                "task {} cannot depend on itself",
                task.id
            )));
        }
        if !seen.insert(*dependency) {
            return Err(ScheduleError::invalid(format!(
                "task {} lists dependency {} more than once",
                task.id, dependency
            )));
        }
    }
    Ok(())
}

/// Field checks for every task plus duplicate ids and dangling dependencies.
/// Cycles are checked separately on the dependency graph.
pub fn validate_task_collection(tasks: &[Task]) -> ScheduleResult<()> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(ScheduleError::invalid(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        validate_task(task)?;
    }

    for task in tasks {
        if let Some(missing) = task
            .dependencies
            .iter()
            .find(|dependency| !seen_ids.contains(*dependency))
        {
            return Err(ScheduleError::invalid(format!(
                "task {} depends on unknown task {}",
                task.id, missing
            )));
        }
    }
    Ok(())
}
