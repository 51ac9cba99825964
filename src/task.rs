use crate::error::ScheduleError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|err| ScheduleError::invalid(format!("invalid task id '{s}': {err}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProjectId {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|err| ScheduleError::invalid(format!("invalid project id '{s}': {err}")))
    }
}

/// Construction trade a task belongs to. Classification only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Demolition,
    Framing,
    Plumbing,
    Electrical,
    Hvac,
    Insulation,
    Drywall,
    Painting,
    Flooring,
    Roofing,
    Cabinets,
    Countertops,
    Tile,
    Trim,
    Landscaping,
    Concrete,
    #[default]
    Other,
}

impl TradeType {
    pub const ALL: [TradeType; 17] = [
        TradeType::Demolition,
        TradeType::Framing,
        TradeType::Plumbing,
        TradeType::Electrical,
        TradeType::Hvac,
        TradeType::Insulation,
        TradeType::Drywall,
        TradeType::Painting,
        TradeType::Flooring,
        TradeType::Roofing,
        TradeType::Cabinets,
        TradeType::Countertops,
        TradeType::Tile,
        TradeType::Trim,
        TradeType::Landscaping,
        TradeType::Concrete,
        TradeType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Demolition => "demolition",
            TradeType::Framing => "framing",
            TradeType::Plumbing => "plumbing",
            TradeType::Electrical => "electrical",
            TradeType::Hvac => "hvac",
            TradeType::Insulation => "insulation",
            TradeType::Drywall => "drywall",
            TradeType::Painting => "painting",
            TradeType::Flooring => "flooring",
            TradeType::Roofing => "roofing",
            TradeType::Cabinets => "cabinets",
            TradeType::Countertops => "countertops",
            TradeType::Tile => "tile",
            TradeType::Trim => "trim",
            TradeType::Landscaping => "landscaping",
            TradeType::Concrete => "concrete",
            TradeType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TradeType::Hvac => "HVAC",
            TradeType::Demolition => "Demolition",
            TradeType::Framing => "Framing",
            TradeType::Plumbing => "Plumbing",
            TradeType::Electrical => "Electrical",
            TradeType::Insulation => "Insulation",
            TradeType::Drywall => "Drywall",
            TradeType::Painting => "Painting",
            TradeType::Flooring => "Flooring",
            TradeType::Roofing => "Roofing",
            TradeType::Cabinets => "Cabinets",
            TradeType::Countertops => "Countertops",
            TradeType::Tile => "Tile",
            TradeType::Trim => "Trim",
            TradeType::Landscaping => "Landscaping",
            TradeType::Concrete => "Concrete",
            TradeType::Other => "Other",
        }
    }

    /// Bar colour used by the Gantt view.
    pub fn color(&self) -> &'static str {
        match self {
            TradeType::Demolition => "#ef4444",
            TradeType::Framing => "#f97316",
            TradeType::Plumbing => "#3b82f6",
            TradeType::Electrical => "#eab308",
            TradeType::Hvac => "#06b6d4",
            TradeType::Insulation => "#ec4899",
            TradeType::Drywall => "#8b5cf6",
            TradeType::Painting => "#10b981",
            TradeType::Flooring => "#84cc16",
            TradeType::Roofing => "#78716c",
            TradeType::Cabinets => "#a855f7",
            TradeType::Countertops => "#14b8a6",
            TradeType::Tile => "#f43f5e",
            TradeType::Trim => "#6366f1",
            TradeType::Landscaping => "#22c55e",
            TradeType::Concrete => "#64748b",
            TradeType::Other => "#94a3b8",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        TradeType::ALL
            .into_iter()
            .find(|trade| trade.as_str() == key)
            .ok_or_else(|| ScheduleError::invalid(format!("unknown trade type '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Delayed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Delayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Delayed => "delayed",
        }
    }

    /// Fraction shown as bar progress: completed is full, in progress is half.
    pub fn progress(&self) -> f64 {
        match self {
            TaskStatus::Completed => 1.0,
            TaskStatus::InProgress => 0.5,
            TaskStatus::NotStarted | TaskStatus::Delayed => 0.0,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| ScheduleError::invalid(format!("unknown task status '{s}'")))
    }
}

fn first_version() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub trade_type: TradeType,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    /// Last working day the task occupies (inclusive).
    pub end_date: NaiveDate,
    /// Tasks that must finish before this one starts.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub sort_order: u32,
    /// Bumped on every committed change; used for optimistic concurrency.
    #[serde(default = "first_version")]
    pub version: u64,
}

impl Task {
    pub fn depends_on(&self, other: TaskId) -> bool {
        self.dependencies.contains(&other)
    }

    pub fn progress(&self) -> f64 {
        self.status.progress()
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    #[serde(default)]
    pub trade_type: TradeType,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, duration_days: u32) -> Self {
        Self {
            name: name.into(),
            trade_type: TradeType::default(),
            start_date,
            duration_days,
            dependencies: Vec::new(),
            status: TaskStatus::default(),
            assigned_to: None,
            notes: None,
        }
    }

    pub fn trade(mut self, trade_type: TradeType) -> Self {
        self.trade_type = trade_type;
        self
    }

    pub fn after(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn assigned_to(mut self, who: impl Into<String>) -> Self {
        self.assigned_to = Some(who.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Field edits for an existing task. `None` leaves a field untouched; a blank
/// `assigned_to` or `notes` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trade_type: Option<TradeType>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Blank free text is stored as absent.
pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
