use chrono::NaiveDate;
use site_schedule::persistence::{
    MemoryTaskStore, PersistenceError, TaskStore, load_schedule, load_schedule_from_csv,
    load_schedule_from_json, persist_change_set, save_schedule_to_csv, save_schedule_to_json,
};
use site_schedule::{
    NewTask, ProjectId, ProjectMetadata, Schedule, TaskStatus, TradeType, WeekendStartPolicy,
    WorkCalendar,
};
use tempfile::tempdir;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn sample_schedule() -> Schedule {
    let mut metadata = ProjectMetadata::new(ProjectId::generate(), "Maple St Remodel");
    metadata.start_date = Some(d(2024, 1, 1));
    metadata.estimated_completion_date = Some(d(2024, 3, 1));
    let mut calendar = WorkCalendar::default();
    calendar.add_holiday(d(2024, 1, 15));
    calendar.set_weekend_start(WeekendStartPolicy::AnchorInPlace);

    let mut schedule = Schedule::new(metadata, calendar);
    let demo = schedule
        .add_task(
            NewTask::new("Demo, kitchen", d(2024, 1, 1), 3)
                .trade(TradeType::Demolition)
                .notes("haul \"everything\" out"),
        )
        .unwrap()
        .updated[0]
        .id;
    let framing = schedule
        .add_task(NewTask::new("Framing", d(2024, 1, 8), 5).trade(TradeType::Framing))
        .unwrap()
        .updated[0]
        .id;
    schedule.create_dependency(demo, framing, None).unwrap();
    schedule
        .set_status(demo, TaskStatus::Completed, None)
        .unwrap();
    schedule
}

#[test]
fn json_snapshot_round_trip() {
    let schedule = sample_schedule();
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.json");

    save_schedule_to_json(&schedule, &path).unwrap();
    let loaded = load_schedule_from_json(&path).unwrap();

    assert_eq!(loaded.metadata(), schedule.metadata());
    assert_eq!(loaded.calendar(), schedule.calendar());
    assert_eq!(loaded.tasks(), schedule.tasks());
}

#[test]
fn csv_snapshot_round_trip() {
    let schedule = sample_schedule();
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.csv");

    save_schedule_to_csv(&schedule, &path).unwrap();
    let loaded = load_schedule_from_csv(&path).unwrap();

    assert_eq!(loaded.metadata(), schedule.metadata());
    assert_eq!(loaded.calendar(), schedule.calendar());
    assert_eq!(loaded.tasks(), schedule.tasks());
}

#[test]
fn json_snapshot_with_cycle_is_rejected() {
    let schedule = sample_schedule();
    let dir = tempdir().unwrap();
    let path = dir.path().join("cyclic.json");
    save_schedule_to_json(&schedule, &path).unwrap();

    let mut value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let framing_id = value["tasks"][1]["id"].clone();
    value["tasks"][0]["dependencies"] = serde_json::json!([framing_id]);
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    assert!(matches!(
        load_schedule_from_json(&path),
        Err(PersistenceError::Schedule(_))
    ));
}

#[test]
fn json_snapshot_with_dangling_dependency_is_rejected() {
    let schedule = sample_schedule();
    let dir = tempdir().unwrap();
    let path = dir.path().join("dangling.json");
    save_schedule_to_json(&schedule, &path).unwrap();

    let mut value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    value["tasks"][0]["dependencies"] =
        serde_json::json!([site_schedule::TaskId::generate().to_string()]);
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let err = load_schedule_from_json(&path).unwrap_err();
    assert!(err.to_string().contains("depends on unknown task"), "{err}");
}

#[test]
fn memory_store_enforces_version_stamps() {
    let store = MemoryTaskStore::new();
    let mut schedule = Schedule::for_project(ProjectId::generate());
    let changes = schedule
        .add_task(NewTask::new("Pour footings", d(2024, 1, 1), 2))
        .unwrap();
    let task = changes.updated[0].clone();

    store.save_task(&task).unwrap();
    assert!(matches!(
        store.save_task(&task),
        Err(PersistenceError::Conflict { stored: 1, incoming: 1, .. })
    ));

    let mut skipped = task.clone();
    skipped.version = 3;
    assert!(matches!(
        store.save_task(&skipped),
        Err(PersistenceError::Conflict { stored: 1, incoming: 3, .. })
    ));

    let mut next = task.clone();
    next.version = 2;
    store.save_task(&next).unwrap();

    let mut unknown = next.clone();
    unknown.id = site_schedule::TaskId::generate();
    assert!(matches!(
        store.save_task(&unknown),
        Err(PersistenceError::NotFound(_))
    ));

    store.delete_task(task.id).unwrap();
    assert!(matches!(
        store.delete_task(task.id),
        Err(PersistenceError::NotFound(_))
    ));
}

#[test]
fn change_sets_keep_store_in_step_with_schedule() {
    let store = MemoryTaskStore::new();
    let metadata = ProjectMetadata::new(ProjectId::generate(), "Garage");
    let mut schedule = Schedule::new(metadata.clone(), WorkCalendar::default());

    let a = schedule
        .add_task(NewTask::new("A", d(2024, 1, 1), 2))
        .unwrap();
    persist_change_set(&store, &a).unwrap();
    let a = a.updated[0].id;
    let b = schedule
        .add_task(NewTask::new("B", d(2024, 1, 3), 2).after([a]))
        .unwrap();
    persist_change_set(&store, &b).unwrap();
    let b = b.updated[0].id;

    let moved = schedule.move_task(a, d(2024, 1, 8), Some(1)).unwrap();
    persist_change_set(&store, &moved).unwrap();
    let shifted = schedule.shift_dependents(a, None).unwrap();
    persist_change_set(&store, &shifted).unwrap();
    let removed = schedule.remove_task(a, None).unwrap();
    persist_change_set(&store, &removed).unwrap();

    let reloaded = load_schedule(&store, metadata, WorkCalendar::default()).unwrap();
    assert_eq!(reloaded.tasks(), schedule.tasks());
    assert_eq!(reloaded.task(b).unwrap().start_date, d(2024, 1, 10));
    assert!(reloaded.task(b).unwrap().dependencies.is_empty());
    assert_eq!(store.len(), 1);
}

#[test]
fn rejected_change_set_leaves_memory_store_untouched() {
    let store = MemoryTaskStore::new();
    let mut schedule = Schedule::for_project(ProjectId::generate());
    let project_id = schedule.project_id();
    let a = schedule
        .add_task(NewTask::new("Footings", d(2024, 1, 1), 3))
        .unwrap();
    persist_change_set(&store, &a).unwrap();
    let a = a.updated[0].id;
    let b = schedule
        .add_task(NewTask::new("Stem walls", d(2024, 1, 8), 2).after([a]))
        .unwrap();
    persist_change_set(&store, &b).unwrap();

    let mut bumped = b.updated[0].clone();
    bumped.version = 2;
    store.save_task(&bumped).unwrap();

    let removed = schedule.remove_task(a, None).unwrap();
    assert_eq!(removed.removed, vec![a]);
    assert!(matches!(
        persist_change_set(&store, &removed),
        Err(PersistenceError::Conflict { stored: 2, incoming: 2, .. })
    ));

    let stored = store.load_tasks(project_id).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, a);
    assert_eq!(stored[1].dependencies, vec![a]);
}

#[test]
fn loading_under_a_new_calendar_writes_moved_tasks_back() {
    let store = MemoryTaskStore::new();
    let metadata = ProjectMetadata::new(ProjectId::generate(), "Duplex");
    let mut schedule = Schedule::new(metadata.clone(), WorkCalendar::default());
    let changes = schedule
        .add_task(NewTask::new("Sheathing", d(2024, 1, 1), 3))
        .unwrap();
    persist_change_set(&store, &changes).unwrap();
    let id = changes.updated[0].id;

    let mut calendar = WorkCalendar::default();
    calendar.add_holiday(d(2024, 1, 2));
    let loaded = load_schedule(&store, metadata.clone(), calendar.clone()).unwrap();
    let task = loaded.task(id).unwrap();
    assert_eq!(task.end_date, d(2024, 1, 4));
    assert_eq!(task.version, 2);
    assert_eq!(store.load_tasks(metadata.project_id).unwrap(), loaded.tasks());

    let again = load_schedule(&store, metadata, calendar).unwrap();
    assert_eq!(again.task(id).unwrap().version, 2);
}
