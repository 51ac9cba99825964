use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A finish-to-start edge whose successor starts on or before the day its
/// predecessor finishes. Informational: the edit that produced it still succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyViolation {
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub predecessor_end: NaiveDate,
    pub successor_start: NaiveDate,
}

impl DependencyViolation {
    /// Same-day adjacency counts as a violation: the successor must start
    /// strictly after the predecessor's last working day.
    pub fn check(predecessor: &Task, successor: &Task) -> Option<Self> {
        if successor.start_date <= predecessor.end_date {
            Some(Self {
                predecessor: predecessor.id,
                successor: successor.id,
                predecessor_end: predecessor.end_date,
                successor_start: successor.start_date,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for DependencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task {} starts {}, on or before predecessor {} finishes {}",
            self.successor, self.successor_start, self.predecessor, self.predecessor_end
        )
    }
}

/// What a committed operation changed. Callers persist `updated` and `removed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub updated: Vec<Task>,
    pub removed: Vec<TaskId>,
    pub violations: Vec<DependencyViolation>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn updated_task(&self, id: TaskId) -> Option<&Task> {
        self.updated.iter().find(|task| task.id == id)
    }
}
