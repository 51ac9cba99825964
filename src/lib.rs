pub mod calculations;
pub mod calendar;
pub mod change_set;
pub mod config;
pub mod error;
pub mod gantt;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod metadata;
pub mod persistence;
pub mod schedule;
pub mod task;
pub mod task_validation;

pub use calendar::{WeekendStartPolicy, WorkCalendar, WorkCalendarConfig};
pub use change_set::{ChangeSet, DependencyViolation};
pub use error::{ScheduleError, ScheduleResult};
pub use gantt::{GanttFeed, GanttLink, GanttTask, task_frame};
pub use metadata::ProjectMetadata;
pub use schedule::{Schedule, ScheduleSummary};
pub use task::{NewTask, ProjectId, Task, TaskId, TaskPatch, TaskStatus, TradeType};
