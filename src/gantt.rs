use crate::schedule::Schedule;
use crate::task::{TaskId, TaskStatus, TradeType};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Finish-to-start in the chart widget's link vocabulary.
pub const FINISH_TO_START: &str = "0";

/// Days from 0001-01-01 (CE) to the unix epoch; polars dates count from the latter.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttTask {
    pub id: TaskId,
    pub text: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: u32,
    pub trade_type: TradeType,
    pub status: TaskStatus,
    pub color: String,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GanttLink {
    pub id: String,
    pub source: TaskId,
    pub target: TaskId,
    #[serde(rename = "type")]
    pub link_type: String,
}

/// Rows and links in the shape a Gantt widget consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GanttFeed {
    pub data: Vec<GanttTask>,
    pub links: Vec<GanttLink>,
}

impl GanttFeed {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let data = schedule
            .tasks()
            .iter()
            .map(|task| GanttTask {
                id: task.id,
                text: task.name.clone(),
                start_date: task.start_date,
                end_date: task.end_date,
                duration: task.duration_days,
                trade_type: task.trade_type,
                status: task.status,
                color: task.trade_type.color().to_string(),
                progress: task.progress(),
                assigned_to: task.assigned_to.clone(),
                version: task.version,
            })
            .collect();

        let links = schedule
            .dependency_edges()
            .into_iter()
            .map(|(source, target)| GanttLink {
                id: format!("{target}-{source}"),
                source,
                target,
                link_type: FINISH_TO_START.to_string(),
            })
            .collect();

        Self { data, links }
    }
}

fn date_to_i32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// The schedule as a frame, one row per task in display order. `#` is the
/// 1-based row number and `depends_on` lists predecessors by that number.
pub fn task_frame(schedule: &Schedule) -> PolarsResult<DataFrame> {
    let tasks = schedule.tasks();
    let rows: HashMap<TaskId, u32> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| (task.id, idx as u32 + 1))
        .collect();

    let numbers: Vec<u32> = (1..=tasks.len() as u32).collect();
    let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let trades: Vec<&str> = tasks.iter().map(|t| t.trade_type.as_str()).collect();
    let starts: Vec<i32> = tasks.iter().map(|t| date_to_i32(t.start_date)).collect();
    let ends: Vec<i32> = tasks.iter().map(|t| date_to_i32(t.end_date)).collect();
    let durations: Vec<u32> = tasks.iter().map(|t| t.duration_days).collect();
    let statuses: Vec<&str> = tasks.iter().map(|t| t.status.as_str()).collect();
    let assignees: Vec<Option<&str>> = tasks.iter().map(|t| t.assigned_to.as_deref()).collect();
    let depends_on: Vec<Series> = tasks
        .iter()
        .map(|t| {
            let preds: Vec<u32> = t
                .dependencies
                .iter()
                .filter_map(|dep| rows.get(dep).copied())
                .collect();
            Series::new(PlSmallStr::from_static(""), preds)
        })
        .collect();
    let versions: Vec<u64> = tasks.iter().map(|t| t.version).collect();

    let start_series =
        Series::new(PlSmallStr::from_static("start"), starts).cast(&DataType::Date)?;
    let end_series = Series::new(PlSmallStr::from_static("end"), ends).cast(&DataType::Date)?;

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("#"), numbers).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("trade"), trades).into_column(),
        start_series.into_column(),
        end_series.into_column(),
        Series::new(PlSmallStr::from_static("duration"), durations).into_column(),
        Series::new(PlSmallStr::from_static("status"), statuses).into_column(),
        Series::new(PlSmallStr::from_static("assigned_to"), assignees).into_column(),
        Series::new(PlSmallStr::from_static("depends_on"), depends_on).into_column(),
        Series::new(PlSmallStr::from_static("version"), versions).into_column(),
    ])
}
