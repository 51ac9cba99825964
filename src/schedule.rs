use crate::calculations::cascade::CascadeShift;
use crate::calendar::WorkCalendar;
use crate::change_set::{ChangeSet, DependencyViolation};
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::DependencyDag;
use crate::metadata::ProjectMetadata;
use crate::task::{NewTask, ProjectId, Task, TaskId, TaskPatch, TaskStatus, normalize_text};
use crate::task_validation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub task_count: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub delayed: usize,
    pub earliest_start: Option<NaiveDate>,
    pub latest_finish: Option<NaiveDate>,
    pub violation_count: usize,
    /// The latest finish falls after the project's estimated completion date.
    pub overruns_estimate: bool,
}

impl ScheduleSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.task_count));
        if let Some(date) = self.earliest_start {
            parts.push(format!("start={date}"));
        }
        if let Some(date) = self.latest_finish {
            parts.push(format!("finish={date}"));
        }
        parts.push(format!(
            "status={}/{}/{}/{}",
            self.not_started, self.in_progress, self.completed, self.delayed
        ));
        if self.violation_count > 0 {
            parts.push(format!("violations={}", self.violation_count));
        }
        if self.overruns_estimate {
            parts.push("overruns_estimate".to_string());
        }
        parts.join(", ")
    }
}

/// Task collection for one project plus the calendar its dates are projected on.
///
/// Every mutation validates first and only then commits, so a returned error
/// means nothing changed. Mutations that take `expected_version` fail with
/// [`ScheduleError::Conflict`] when the task has moved on; `None` skips the check.
#[derive(Debug, Clone)]
pub struct Schedule {
    metadata: ProjectMetadata,
    calendar: WorkCalendar,
    tasks: Vec<Task>,
}

impl Schedule {
    pub fn new(metadata: ProjectMetadata, calendar: WorkCalendar) -> Self {
        Self {
            metadata,
            calendar,
            tasks: Vec::new(),
        }
    }

    pub fn for_project(project_id: ProjectId) -> Self {
        Self::new(
            ProjectMetadata::new(project_id, "New Project"),
            WorkCalendar::default(),
        )
    }

    /// Rebuild a schedule from stored tasks. End dates are re-derived from the
    /// calendar with versions left alone, so a task whose dates moved differs
    /// from its stored copy at the same version; use [`Schedule::reproject`]
    /// when that copy has to be brought back in step. The collection must be
    /// free of duplicates, dangling dependencies and cycles.
    pub fn from_tasks(
        metadata: ProjectMetadata,
        calendar: WorkCalendar,
        tasks: Vec<Task>,
    ) -> ScheduleResult<Self> {
        Self::build_from(metadata, calendar, tasks, false).map(|(schedule, _)| schedule)
    }

    /// Like [`Schedule::from_tasks`], but every task whose dates moved gets a
    /// new version and is returned in the change set for writing back.
    pub fn reproject(
        metadata: ProjectMetadata,
        calendar: WorkCalendar,
        tasks: Vec<Task>,
    ) -> ScheduleResult<(Self, ChangeSet)> {
        Self::build_from(metadata, calendar, tasks, true)
    }

    fn build_from(
        metadata: ProjectMetadata,
        calendar: WorkCalendar,
        mut tasks: Vec<Task>,
        restamp: bool,
    ) -> ScheduleResult<(Self, ChangeSet)> {
        Self::validate_metadata(&metadata)?;
        tasks.sort_by_key(|task| task.sort_order);
        let mut moved = Vec::new();
        for (idx, task) in tasks.iter_mut().enumerate() {
            if task.project_id != metadata.project_id {
                return Err(ScheduleError::invalid(format!(
                    "task {} belongs to project {}, not {}",
                    task.id, task.project_id, metadata.project_id
                )));
            }
            task_validation::validate_duration(task.duration_days)?;
            let (start, end) = calendar.project(task.start_date, task.duration_days)?;
            if (start, end) != (task.start_date, task.end_date) {
                task.start_date = start;
                task.end_date = end;
                if restamp {
                    task.version += 1;
                    moved.push(idx);
                }
            }
        }
        task_validation::validate_task_collection(&tasks)?;
        DependencyDag::build(&tasks).topological_order()?;

        let changes = ChangeSet {
            updated: moved.into_iter().map(|idx| tasks[idx].clone()).collect(),
            ..ChangeSet::default()
        };
        let schedule = Self {
            metadata,
            calendar,
            tasks,
        };
        Ok((schedule, changes))
    }

    fn validate_metadata(metadata: &ProjectMetadata) -> ScheduleResult<()> {
        if let (Some(start), Some(estimate)) =
            (metadata.start_date, metadata.estimated_completion_date)
        {
            if start > estimate {
                return Err(ScheduleError::invalid(format!(
                    "project start date {start} must be on or before estimated completion {estimate}"
                )));
            }
        }
        Ok(())
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    pub fn project_id(&self) -> ProjectId {
        self.metadata.project_id
    }

    pub fn set_metadata(&mut self, metadata: ProjectMetadata) -> ScheduleResult<()> {
        Self::validate_metadata(&metadata)?;
        if metadata.project_id != self.metadata.project_id && !self.tasks.is_empty() {
            return Err(ScheduleError::invalid(
                "cannot change the project id of a schedule that has tasks",
            ));
        }
        self.metadata = metadata;
        Ok(())
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// `(predecessor, successor)` pairs, in task order.
    pub fn dependency_edges(&self) -> Vec<(TaskId, TaskId)> {
        self.tasks
            .iter()
            .flat_map(|task| task.dependencies.iter().map(move |dep| (*dep, task.id)))
            .collect()
    }

    fn position(&self, id: TaskId) -> ScheduleResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(ScheduleError::NotFound { task: id })
    }

    fn checked_position(&self, id: TaskId, expected_version: Option<u64>) -> ScheduleResult<usize> {
        let idx = self.position(id)?;
        if let Some(expected) = expected_version {
            let actual = self.tasks[idx].version;
            if actual != expected {
                return Err(ScheduleError::Conflict {
                    task: id,
                    expected,
                    actual,
                });
            }
        }
        Ok(idx)
    }

    /// Store `candidate` at `idx` if it differs from what is there, bumping the version.
    fn commit(&mut self, idx: usize, mut candidate: Task) -> Option<Task> {
        if self.tasks[idx] == candidate {
            return None;
        }
        candidate.version = self.tasks[idx].version + 1;
        self.tasks[idx] = candidate.clone();
        Some(candidate)
    }

    fn next_sort_order(&self) -> u32 {
        self.tasks
            .iter()
            .map(|task| task.sort_order)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Violations on edges into and out of `id`.
    fn violations_around(&self, id: TaskId) -> Vec<DependencyViolation> {
        let by_id: HashMap<TaskId, &Task> = self.tasks.iter().map(|t| (t.id, t)).collect();
        let mut violations = Vec::new();
        for successor in &self.tasks {
            for pred_id in &successor.dependencies {
                if successor.id != id && *pred_id != id {
                    continue;
                }
                if let Some(predecessor) = by_id.get(pred_id) {
                    violations.extend(DependencyViolation::check(predecessor, successor));
                }
            }
        }
        violations
    }

    pub fn dependency_violations(&self) -> Vec<DependencyViolation> {
        let by_id: HashMap<TaskId, &Task> = self.tasks.iter().map(|t| (t.id, t)).collect();
        self.tasks
            .iter()
            .flat_map(|successor| {
                successor
                    .dependencies
                    .iter()
                    .filter_map(|pred_id| by_id.get(pred_id))
                    .filter_map(move |predecessor| DependencyViolation::check(predecessor, successor))
            })
            .collect()
    }

    fn finish(&self, operation: &str, id: TaskId, changes: ChangeSet) -> ChangeSet {
        debug!(
            task = %id,
            updated = changes.updated.len(),
            removed = changes.removed.len(),
            "{operation} committed"
        );
        for violation in &changes.violations {
            warn!(
                predecessor = %violation.predecessor,
                successor = %violation.successor,
                "{violation}"
            );
        }
        changes
    }

    pub fn add_task(&mut self, new_task: NewTask) -> ScheduleResult<ChangeSet> {
        let name = task_validation::validate_name(&new_task.name)?;
        task_validation::validate_duration(new_task.duration_days)?;

        let mut dependencies: Vec<TaskId> = Vec::with_capacity(new_task.dependencies.len());
        for dependency in new_task.dependencies {
            self.position(dependency)?;
            if !dependencies.contains(&dependency) {
                dependencies.push(dependency);
            }
        }

        let (start_date, end_date) = self
            .calendar
            .project(new_task.start_date, new_task.duration_days)?;

        let task = Task {
            id: TaskId::generate(),
            project_id: self.metadata.project_id,
            name,
            trade_type: new_task.trade_type,
            start_date,
            duration_days: new_task.duration_days,
            end_date,
            dependencies,
            status: new_task.status,
            assigned_to: normalize_text(new_task.assigned_to),
            notes: normalize_text(new_task.notes),
            sort_order: self.next_sort_order(),
            version: 1,
        };
        task_validation::validate_task(&task)?;

        let mut candidate = self.tasks.clone();
        candidate.push(task.clone());
        DependencyDag::build(&candidate).topological_order()?;

        let id = task.id;
        self.tasks = candidate;
        let changes = ChangeSet {
            updated: vec![task],
            removed: Vec::new(),
            violations: self.violations_around(id),
        };
        Ok(self.finish("add_task", id, changes))
    }

    fn reschedule(
        &mut self,
        operation: &str,
        id: TaskId,
        start: NaiveDate,
        duration_days: u32,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        task_validation::validate_duration(duration_days)?;
        let idx = self.checked_position(id, expected_version)?;
        let (start_date, end_date) = self.calendar.project(start, duration_days)?;

        let mut candidate = self.tasks[idx].clone();
        candidate.start_date = start_date;
        candidate.duration_days = duration_days;
        candidate.end_date = end_date;

        let updated = self.commit(idx, candidate).into_iter().collect();
        let changes = ChangeSet {
            updated,
            removed: Vec::new(),
            violations: self.violations_around(id),
        };
        Ok(self.finish(operation, id, changes))
    }

    /// Drag-move: new start, same duration. Dependents are not moved; any edge
    /// this breaks is reported in the change set.
    pub fn move_task(
        &mut self,
        id: TaskId,
        new_start: NaiveDate,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        let duration = self.tasks[self.position(id)?].duration_days;
        self.reschedule("move_task", id, new_start, duration, expected_version)
    }

    /// Drag-resize: new duration from the existing start.
    pub fn resize_task(
        &mut self,
        id: TaskId,
        new_duration_days: u32,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        let start = self.tasks[self.position(id)?].start_date;
        self.reschedule("resize_task", id, start, new_duration_days, expected_version)
    }

    pub fn update_task(
        &mut self,
        id: TaskId,
        patch: TaskPatch,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        let idx = self.checked_position(id, expected_version)?;
        let mut candidate = self.tasks[idx].clone();

        if let Some(name) = patch.name {
            candidate.name = task_validation::validate_name(&name)?;
        }
        if let Some(trade_type) = patch.trade_type {
            candidate.trade_type = trade_type;
        }
        if let Some(status) = patch.status {
            candidate.status = status;
        }
        if patch.assigned_to.is_some() {
            candidate.assigned_to = normalize_text(patch.assigned_to);
        }
        if patch.notes.is_some() {
            candidate.notes = normalize_text(patch.notes);
        }
        if patch.start_date.is_some() || patch.duration_days.is_some() {
            let start = patch.start_date.unwrap_or(candidate.start_date);
            let duration = patch.duration_days.unwrap_or(candidate.duration_days);
            task_validation::validate_duration(duration)?;
            let (start_date, end_date) = self.calendar.project(start, duration)?;
            candidate.start_date = start_date;
            candidate.duration_days = duration;
            candidate.end_date = end_date;
        }

        let updated = self.commit(idx, candidate).into_iter().collect();
        let changes = ChangeSet {
            updated,
            removed: Vec::new(),
            violations: self.violations_around(id),
        };
        Ok(self.finish("update_task", id, changes))
    }

    pub fn set_status(
        &mut self,
        id: TaskId,
        status: TaskStatus,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        let idx = self.checked_position(id, expected_version)?;
        let mut candidate = self.tasks[idx].clone();
        candidate.status = status;
        let updated = self.commit(idx, candidate).into_iter().collect();
        let changes = ChangeSet {
            updated,
            ..ChangeSet::default()
        };
        Ok(self.finish("set_status", id, changes))
    }

    /// Make `successor` wait for `predecessor` to finish. `expected_version`
    /// refers to the successor, the task whose dependency list changes.
    pub fn create_dependency(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        if predecessor == successor {
            return Err(ScheduleError::invalid(format!(
                "task {predecessor} cannot depend on itself"
            )));
        }
        let pred_idx = self.position(predecessor)?;
        let succ_idx = self.checked_position(successor, expected_version)?;

        if self.tasks[succ_idx].depends_on(predecessor) {
            return Err(ScheduleError::invalid(format!(
                "task {successor} already depends on task {predecessor}"
            )));
        }

        let dag = DependencyDag::build(&self.tasks);
        if dag.would_create_cycle(predecessor, successor) {
            return Err(ScheduleError::CycleDetected {
                predecessor,
                successor,
            });
        }

        let mut candidate = self.tasks[succ_idx].clone();
        candidate.dependencies.push(predecessor);
        let violations = DependencyViolation::check(&self.tasks[pred_idx], &candidate)
            .into_iter()
            .collect();

        let updated = self.commit(succ_idx, candidate).into_iter().collect();
        let changes = ChangeSet {
            updated,
            removed: Vec::new(),
            violations,
        };
        Ok(self.finish("create_dependency", successor, changes))
    }

    pub fn remove_dependency(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        self.position(predecessor)?;
        let succ_idx = self.checked_position(successor, expected_version)?;
        if !self.tasks[succ_idx].depends_on(predecessor) {
            return Err(ScheduleError::DependencyNotFound {
                predecessor,
                successor,
            });
        }

        let mut candidate = self.tasks[succ_idx].clone();
        candidate.dependencies.retain(|dep| *dep != predecessor);
        let updated = self.commit(succ_idx, candidate).into_iter().collect();
        let changes = ChangeSet {
            updated,
            ..ChangeSet::default()
        };
        Ok(self.finish("remove_dependency", successor, changes))
    }

    /// Delete a task and strip it from every dependency list. Unknown ids are
    /// `NotFound`, never a silent no-op.
    pub fn remove_task(
        &mut self,
        id: TaskId,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        let idx = self.checked_position(id, expected_version)?;
        self.tasks.remove(idx);

        let mut updated = Vec::new();
        for task in &mut self.tasks {
            if task.depends_on(id) {
                task.dependencies.retain(|dep| *dep != id);
                task.version += 1;
                updated.push(task.clone());
            }
        }

        let changes = ChangeSet {
            updated,
            removed: vec![id],
            violations: Vec::new(),
        };
        Ok(self.finish("remove_task", id, changes))
    }

    /// Opt-in cascade: move every task downstream of `id` later until its
    /// incoming edges are satisfied. `expected_version` refers to `id`.
    pub fn shift_dependents(
        &mut self,
        id: TaskId,
        expected_version: Option<u64>,
    ) -> ScheduleResult<ChangeSet> {
        self.checked_position(id, expected_version)?;
        let moves = CascadeShift::new(&self.tasks, &self.calendar).execute(id)?;

        let mut updated = Vec::with_capacity(moves.len());
        let mut touched = HashSet::with_capacity(moves.len() + 1);
        touched.insert(id);
        for idx in 0..self.tasks.len() {
            let task_id = self.tasks[idx].id;
            if let Some(&(start_date, end_date)) = moves.get(&task_id) {
                let mut candidate = self.tasks[idx].clone();
                candidate.start_date = start_date;
                candidate.end_date = end_date;
                if let Some(task) = self.commit(idx, candidate) {
                    updated.push(task);
                }
                touched.insert(task_id);
            }
        }

        let violations = self
            .dependency_violations()
            .into_iter()
            .filter(|v| touched.contains(&v.successor) || touched.contains(&v.predecessor))
            .collect();
        let changes = ChangeSet {
            updated,
            removed: Vec::new(),
            violations,
        };
        Ok(self.finish("shift_dependents", id, changes))
    }

    /// Swap the calendar and re-derive every task's dates under it.
    pub fn set_calendar(&mut self, calendar: WorkCalendar) -> ScheduleResult<ChangeSet> {
        let mut candidates = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let (start_date, end_date) = calendar.project(task.start_date, task.duration_days)?;
            let mut candidate = task.clone();
            candidate.start_date = start_date;
            candidate.end_date = end_date;
            candidates.push(candidate);
        }

        self.calendar = calendar;
        let mut updated = Vec::new();
        for (idx, candidate) in candidates.into_iter().enumerate() {
            if let Some(task) = self.commit(idx, candidate) {
                updated.push(task);
            }
        }
        let violations = self.dependency_violations();
        debug!(rescheduled = updated.len(), "calendar replaced");
        Ok(ChangeSet {
            updated,
            removed: Vec::new(),
            violations,
        })
    }

    pub fn summary(&self) -> ScheduleSummary {
        let mut summary = ScheduleSummary {
            task_count: self.tasks.len(),
            ..ScheduleSummary::default()
        };
        for task in &self.tasks {
            match task.status {
                TaskStatus::NotStarted => summary.not_started += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Delayed => summary.delayed += 1,
            }
        }
        summary.earliest_start = self.tasks.iter().map(|t| t.start_date).min();
        summary.latest_finish = self.tasks.iter().map(|t| t.end_date).max();
        summary.violation_count = self.dependency_violations().len();
        summary.overruns_estimate = matches!(
            (summary.latest_finish, self.metadata.estimated_completion_date),
            (Some(finish), Some(estimate)) if finish > estimate
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn commit_skips_unchanged_candidates() {
        let mut s = Schedule::for_project(ProjectId::generate());
        let id = s.add_task(NewTask::new("Frame", d(2024, 1, 1), 3)).unwrap().updated[0].id;
        let idx = s.position(id).unwrap();
        let same = s.tasks[idx].clone();
        assert!(s.commit(idx, same).is_none());
        assert_eq!(s.tasks[idx].version, 1);
    }

    #[test]
    fn sort_order_grows_with_each_added_task() {
        let mut s = Schedule::for_project(ProjectId::generate());
        s.add_task(NewTask::new("A", d(2024, 1, 1), 1)).unwrap();
        s.add_task(NewTask::new("B", d(2024, 1, 1), 1)).unwrap();
        let orders: Vec<u32> = s.tasks().iter().map(|t| t.sort_order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn summary_flags_overrun_against_estimate() {
        let mut metadata = ProjectMetadata::default();
        metadata.estimated_completion_date = Some(d(2024, 1, 3));
        let mut s = Schedule::new(metadata, WorkCalendar::default());
        s.add_task(NewTask::new("Pour slab", d(2024, 1, 1), 5).status(TaskStatus::InProgress))
            .unwrap();

        let summary = s.summary();
        assert_eq!(summary.task_count, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.latest_finish, Some(d(2024, 1, 5)));
        assert!(summary.overruns_estimate);
        assert!(summary.to_cli_summary().contains("overruns_estimate"));
    }

    #[test]
    fn reproject_restamps_only_tasks_whose_dates_moved() {
        let mut s = Schedule::for_project(ProjectId::generate());
        s.add_task(NewTask::new("Rough-in", d(2024, 1, 1), 3)).unwrap();
        s.add_task(NewTask::new("Trim", d(2024, 1, 10), 2)).unwrap();

        let mut calendar = WorkCalendar::default();
        calendar.add_holiday(d(2024, 1, 2));
        let (loaded, changes) =
            Schedule::reproject(s.metadata().clone(), calendar.clone(), s.tasks().to_vec())
                .unwrap();

        assert_eq!(changes.updated.len(), 1);
        assert_eq!(changes.updated[0].end_date, d(2024, 1, 4));
        assert_eq!(changes.updated[0].version, 2);
        assert_eq!(loaded.tasks()[0], changes.updated[0]);
        assert_eq!(loaded.tasks()[1].version, 1);

        let plain = Schedule::from_tasks(s.metadata().clone(), calendar, s.tasks().to_vec())
            .unwrap();
        assert_eq!(plain.tasks()[0].end_date, d(2024, 1, 4));
        assert_eq!(plain.tasks()[0].version, 1);
    }
}
