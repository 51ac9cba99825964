use crate::calendar::WorkCalendar;
use crate::error::ScheduleResult;
use crate::graph::DependencyDag;
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Pushes the tasks downstream of a root later until every finish-to-start
/// edge into them is satisfied. Tasks never move earlier and keep their durations.
pub struct CascadeShift<'a> {
    tasks: &'a [Task],
    calendar: &'a WorkCalendar,
}

impl<'a> CascadeShift<'a> {
    pub fn new(tasks: &'a [Task], calendar: &'a WorkCalendar) -> Self {
        Self { tasks, calendar }
    }

    /// New `(start, end)` for each task that has to move.
    pub fn execute(&self, root: TaskId) -> ScheduleResult<HashMap<TaskId, (NaiveDate, NaiveDate)>> {
        let dag = DependencyDag::build(self.tasks);
        let order = dag.topological_order()?;
        let downstream: HashSet<TaskId> = dag.downstream_of(root).into_iter().collect();

        let by_id: HashMap<TaskId, &Task> = self.tasks.iter().map(|t| (t.id, t)).collect();
        let mut finishes: HashMap<TaskId, NaiveDate> =
            self.tasks.iter().map(|t| (t.id, t.end_date)).collect();
        let mut moved = HashMap::new();

        for task_id in order {
            if !downstream.contains(&task_id) {
                continue;
            }
            let Some(task) = by_id.get(&task_id) else {
                continue;
            };

            let latest_pred_finish = task
                .dependencies
                .iter()
                .filter_map(|pred_id| finishes.get(pred_id))
                .max()
                .copied();

            let Some(pred_finish) = latest_pred_finish else {
                continue;
            };
            if task.start_date > pred_finish {
                continue;
            }

            let earliest_start = self.calendar.next_available(pred_finish)?;
            let (start, end) = self.calendar.project(earliest_start, task.duration_days)?;
            finishes.insert(task_id, end);
            moved.insert(task_id, (start, end));
        }

        Ok(moved)
    }
}
