use super::{PersistenceError, PersistenceResult};
use crate::{
    calendar::{WorkCalendar, WorkCalendarConfig},
    metadata::ProjectMetadata,
    schedule::Schedule,
    task::{Task, TaskId, TaskStatus, TradeType},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const METADATA_ROW_NAME: &str = "__metadata__";

#[derive(Serialize, Deserialize)]
struct ScheduleSnapshot {
    metadata: ProjectMetadata,
    #[serde(default)]
    calendar: WorkCalendarConfig,
    tasks: Vec<Task>,
}

impl ScheduleSnapshot {
    fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            metadata: schedule.metadata().clone(),
            calendar: schedule.calendar().to_config(),
            tasks: schedule.tasks().to_vec(),
        }
    }

    fn into_schedule(self) -> PersistenceResult<Schedule> {
        let calendar = WorkCalendar::from_config(&self.calendar)?;
        Ok(Schedule::from_tasks(self.metadata, calendar, self.tasks)?)
    }
}

pub fn save_schedule_to_json<P: AsRef<Path>>(
    schedule: &Schedule,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = ScheduleSnapshot::from_schedule(schedule);
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    info!(path = %path.as_ref().display(), tasks = snapshot.tasks.len(), "saved json snapshot");
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path.as_ref())?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    let schedule = snapshot.into_schedule()?;
    info!(path = %path.as_ref().display(), tasks = schedule.tasks().len(), "loaded json snapshot");
    Ok(schedule)
}

#[derive(Default, Serialize, Deserialize)]
struct TaskCsvRecord {
    id: String,
    name: String,
    trade_type: String,
    start_date: String,
    duration_days: String,
    end_date: String,
    dependencies: String,
    status: String,
    assigned_to: String,
    notes: String,
    sort_order: String,
    version: String,
    metadata_json: String,
    calendar_json: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        TaskCsvRecord {
            id: task.id.to_string(),
            name: task.name.clone(),
            trade_type: task.trade_type.as_str().to_string(),
            start_date: format_date(task.start_date),
            duration_days: task.duration_days.to_string(),
            end_date: format_date(task.end_date),
            dependencies: join_ids(&task.dependencies),
            status: task.status.as_str().to_string(),
            assigned_to: task.assigned_to.clone().unwrap_or_default(),
            notes: task.notes.clone().unwrap_or_default(),
            sort_order: task.sort_order.to_string(),
            version: task.version.to_string(),
            ..TaskCsvRecord::default()
        }
    }
}

impl TaskCsvRecord {
    fn metadata_row(schedule: &Schedule) -> PersistenceResult<Self> {
        Ok(TaskCsvRecord {
            name: METADATA_ROW_NAME.to_string(),
            metadata_json: serde_json::to_string(schedule.metadata())?,
            calendar_json: serde_json::to_string(&schedule.calendar().to_config())?,
            ..TaskCsvRecord::default()
        })
    }

    fn is_metadata_row(&self) -> bool {
        !self.metadata_json.trim().is_empty()
    }

    fn into_task(self, metadata: &ProjectMetadata) -> PersistenceResult<Task> {
        if self.is_metadata_row() {
            return Err(PersistenceError::InvalidData(
                "metadata row cannot be converted to task".into(),
            ));
        }
        Ok(Task {
            id: TaskId::from_str(self.id.trim())?,
            project_id: metadata.project_id,
            name: self.name,
            trade_type: parse_or_default::<TradeType>(&self.trade_type)?,
            start_date: parse_date(&self.start_date)?,
            duration_days: parse_number(&self.duration_days, "duration_days")?,
            end_date: parse_date(&self.end_date)?,
            dependencies: split_ids(&self.dependencies)?,
            status: parse_or_default::<TaskStatus>(&self.status)?,
            assigned_to: parse_string_option(self.assigned_to),
            notes: parse_string_option(self.notes),
            sort_order: parse_number(&self.sort_order, "sort_order")?,
            version: parse_number(&self.version, "version")?,
        })
    }
}

pub fn save_schedule_to_csv<P: AsRef<Path>>(schedule: &Schedule, path: P) -> PersistenceResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = csv::Writer::from_writer(file);
    writer.serialize(TaskCsvRecord::metadata_row(schedule)?)?;
    for task in schedule.tasks() {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), tasks = schedule.tasks().len(), "saved csv snapshot");
    Ok(())
}

/// The metadata row may appear anywhere in the file but at most once; without
/// it tasks are loaded into a fresh project on the default calendar.
pub fn load_schedule_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    let mut metadata: Option<ProjectMetadata> = None;
    let mut calendar_config: Option<WorkCalendarConfig> = None;

    for record in reader.deserialize::<TaskCsvRecord>() {
        let record = record?;
        if record.is_metadata_row() {
            if metadata.is_some() {
                return Err(PersistenceError::InvalidData(
                    "CSV file contained multiple metadata rows".into(),
                ));
            }
            metadata = Some(serde_json::from_str(&record.metadata_json).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid metadata json: {err}"))
            })?);
            if !record.calendar_json.trim().is_empty() {
                calendar_config =
                    Some(serde_json::from_str(&record.calendar_json).map_err(|err| {
                        PersistenceError::InvalidData(format!("invalid calendar json: {err}"))
                    })?);
            }
            continue;
        }
        records.push(record);
    }

    let metadata = metadata.unwrap_or_default();
    let calendar = match calendar_config {
        Some(config) => WorkCalendar::from_config(&config)?,
        None => WorkCalendar::default(),
    };
    let tasks = records
        .into_iter()
        .map(|record| record.into_task(&metadata))
        .collect::<PersistenceResult<Vec<_>>>()?;

    let schedule = Schedule::from_tasks(metadata, calendar, tasks)?;
    info!(path = %path.as_ref().display(), tasks = schedule.tasks().len(), "loaded csv snapshot");
    Ok(schedule)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(input: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_number<T>(input: &str, field: &str) -> PersistenceResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    input.trim().parse::<T>().map_err(|e| {
        PersistenceError::InvalidData(format!("invalid {field} '{input}': {e}"))
    })
}

fn parse_or_default<T>(input: &str) -> PersistenceResult<T>
where
    T: FromStr<Err = crate::error::ScheduleError> + Default,
{
    if input.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(T::from_str(input.trim())?)
}

fn join_ids(values: &[TaskId]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn split_ids(input: &str) -> PersistenceResult<Vec<TaskId>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(';')
        .map(|part| TaskId::from_str(part.trim()).map_err(PersistenceError::from))
        .collect()
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
