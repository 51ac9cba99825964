use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{
    ChangeSet, DependencyViolation, GanttFeed, Schedule, ScheduleError, ScheduleResult,
    ScheduleSummary, Task,
    persistence::{PersistenceError, TaskStore, persist_change_set},
    task::{NewTask, TaskId, TaskPatch, TaskStatus},
};

#[derive(Clone)]
pub struct AppState {
    schedule: Arc<RwLock<Schedule>>,
    store: Option<Arc<dyn TaskStore>>,
}

impl AppState {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule: Arc::new(RwLock::new(schedule)),
            store: None,
        }
    }

    /// Every committed change is also written to `store`; a failed write
    /// leaves the in-memory schedule untouched.
    pub fn with_store(schedule: Schedule, store: Arc<dyn TaskStore>) -> Self {
        Self {
            schedule: Arc::new(RwLock::new(schedule)),
            store: Some(store),
        }
    }

    pub fn with_shared(schedule: Arc<RwLock<Schedule>>) -> Self {
        Self {
            schedule,
            store: None,
        }
    }

    fn schedule(&self) -> Arc<RwLock<Schedule>> {
        self.schedule.clone()
    }

    /// Run one engine operation against a copy and swap it in once the store
    /// has accepted the change set.
    fn apply<F>(&self, op: F) -> Result<ChangeSet, ApiError>
    where
        F: FnOnce(&mut Schedule) -> ScheduleResult<ChangeSet>,
    {
        let mut guard = self.schedule.write();
        let mut candidate = guard.clone();
        let changes = op(&mut candidate)?;
        if let Some(store) = &self.store {
            persist_change_set(store.as_ref(), &changes)?;
        }
        *guard = candidate;
        Ok(changes)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict { kind: &'static str, message: String },
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        let message = value.to_string();
        match value {
            ScheduleError::InvalidInput(_) => ApiError::Invalid(message),
            ScheduleError::NotFound { .. } | ScheduleError::DependencyNotFound { .. } => {
                ApiError::NotFound(message)
            }
            ScheduleError::CycleDetected { .. } => ApiError::Conflict {
                kind: "cycle_detected",
                message,
            },
            ScheduleError::Conflict { .. } => ApiError::Conflict {
                kind: "conflict",
                message,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::Invalid(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::Invalid(value.body_text())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::Schedule(err) => err.into(),
            PersistenceError::Conflict { .. } | PersistenceError::NotFound(_) => {
                ApiError::Conflict {
                    kind: "conflict",
                    message: value.to_string(),
                }
            }
            other => {
                error!(error = %other, "store rejected change set");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict { kind, message } => (StatusCode::CONFLICT, kind, message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct VersionQuery {
    expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PatchPayload {
    #[serde(flatten)]
    patch: TaskPatch,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MovePayload {
    start_date: NaiveDate,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResizePayload {
    duration_days: u32,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: TaskStatus,
    #[serde(default)]
    expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LinkPayload {
    source: TaskId,
    target: TaskId,
    #[serde(default)]
    expected_version: Option<u64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/:id/move", post(move_task))
        .route("/tasks/:id/resize", post(resize_task))
        .route("/tasks/:id/status", post(set_status))
        .route("/tasks/:id/shift_dependents", post(shift_dependents))
        .route("/links", post(create_link))
        .route("/links/:source/:target", delete(delete_link))
        .route("/violations", get(list_violations))
        .route("/gantt", get(gantt))
        .route("/summary", get(summary))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    TaskId::from_str(raw).map_err(|err| ApiError::invalid(err.to_string()))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let schedule = state.schedule();
    let tasks = {
        let guard = schedule.read();
        guard.tasks().to_vec()
    };
    Json(tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task_id = parse_id(&task_id)?;
    let schedule = state.schedule();
    let task = {
        let guard = schedule.read();
        guard.task(task_id).cloned()
    };
    task.map(Json)
        .ok_or_else(|| ScheduleError::NotFound { task: task_id }.into())
}

async fn create_task(
    State(state): State<AppState>,
    new_task: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<ChangeSet>), ApiError> {
    let Json(new_task) = new_task?;
    let changes = state.apply(|schedule| schedule.add_task(new_task))?;
    Ok((StatusCode::CREATED, Json(changes)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    payload: Result<Json<PatchPayload>, JsonRejection>,
) -> Result<Json<ChangeSet>, ApiError> {
    let task_id = parse_id(&task_id)?;
    let Json(payload) = payload?;
    let changes = state.apply(|schedule| {
        schedule.update_task(task_id, payload.patch, payload.expected_version)
    })?;
    Ok(Json(changes))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<ChangeSet>, ApiError> {
    let task_id = parse_id(&task_id)?;
    let Query(query) = query?;
    let changes =
        state.apply(|schedule| schedule.remove_task(task_id, query.expected_version))?;
    Ok(Json(changes))
}

async fn move_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    payload: Result<Json<MovePayload>, JsonRejection>,
) -> Result<Json<ChangeSet>, ApiError> {
    let task_id = parse_id(&task_id)?;
    let Json(payload) = payload?;
    let changes = state.apply(|schedule| {
        schedule.move_task(task_id, payload.start_date, payload.expected_version)
    })?;
    Ok(Json(changes))
}

async fn resize_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    payload: Result<Json<ResizePayload>, JsonRejection>,
) -> Result<Json<ChangeSet>, ApiError> {
    let task_id = parse_id(&task_id)?;
    let Json(payload) = payload?;
    let changes = state.apply(|schedule| {
        schedule.resize_task(task_id, payload.duration_days, payload.expected_version)
    })?;
    Ok(Json(changes))
}

async fn set_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    payload: Result<Json<StatusPayload>, JsonRejection>,
) -> Result<Json<ChangeSet>, ApiError> {
    let task_id = parse_id(&task_id)?;
    let Json(payload) = payload?;
    let changes = state.apply(|schedule| {
        schedule.set_status(task_id, payload.status, payload.expected_version)
    })?;
    Ok(Json(changes))
}

async fn shift_dependents(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<ChangeSet>, ApiError> {
    let task_id = parse_id(&task_id)?;
    let Query(query) = query?;
    let changes =
        state.apply(|schedule| schedule.shift_dependents(task_id, query.expected_version))?;
    Ok(Json(changes))
}

async fn create_link(
    State(state): State<AppState>,
    payload: Result<Json<LinkPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<ChangeSet>), ApiError> {
    let Json(payload) = payload?;
    let changes = state.apply(|schedule| {
        schedule.create_dependency(payload.source, payload.target, payload.expected_version)
    })?;
    Ok((StatusCode::CREATED, Json(changes)))
}

async fn delete_link(
    State(state): State<AppState>,
    Path((source, target)): Path<(String, String)>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<ChangeSet>, ApiError> {
    let source = parse_id(&source)?;
    let target = parse_id(&target)?;
    let Query(query) = query?;
    let changes = state.apply(|schedule| {
        schedule.remove_dependency(source, target, query.expected_version)
    })?;
    Ok(Json(changes))
}

async fn list_violations(State(state): State<AppState>) -> Json<Vec<DependencyViolation>> {
    let schedule = state.schedule();
    let violations = {
        let guard = schedule.read();
        guard.dependency_violations()
    };
    Json(violations)
}

async fn gantt(State(state): State<AppState>) -> Json<GanttFeed> {
    let schedule = state.schedule();
    let feed = {
        let guard = schedule.read();
        GanttFeed::from_schedule(&guard)
    };
    Json(feed)
}

async fn summary(State(state): State<AppState>) -> Json<ScheduleSummary> {
    let schedule = state.schedule();
    let summary = {
        let guard = schedule.read();
        guard.summary()
    };
    Json(summary)
}
