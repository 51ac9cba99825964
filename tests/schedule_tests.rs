use chrono::NaiveDate;
use site_schedule::{
    NewTask, ProjectId, ProjectMetadata, Schedule, ScheduleError, TaskId, TaskPatch, TaskStatus,
    TradeType, WeekendStartPolicy, WorkCalendar,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn schedule() -> Schedule {
    Schedule::for_project(ProjectId::generate())
}

fn add(schedule: &mut Schedule, name: &str, start: NaiveDate, days: u32) -> TaskId {
    schedule.add_task(NewTask::new(name, start, days)).unwrap().updated[0].id
}

#[test]
fn add_task_projects_end_date_and_starts_at_version_one() {
    let mut s = schedule();
    let changes = s
        .add_task(
            NewTask::new("  Rough-in  ", d(2024, 1, 1), 5)
                .trade(TradeType::Electrical)
                .assigned_to("Sparky Co"),
        )
        .unwrap();
    let task = &changes.updated[0];
    assert_eq!(task.name, "Rough-in");
    assert_eq!(task.end_date, d(2024, 1, 5));
    assert_eq!(task.version, 1);
    assert_eq!(task.trade_type, TradeType::Electrical);
    assert_eq!(task.assigned_to.as_deref(), Some("Sparky Co"));
    assert_eq!(task.project_id, s.project_id());
    assert!(!changes.has_violations());
}

#[test]
fn add_task_rejects_bad_input() {
    let mut s = schedule();
    assert!(matches!(
        s.add_task(NewTask::new("   ", d(2024, 1, 1), 5)),
        Err(ScheduleError::InvalidInput(_))
    ));
    assert!(matches!(
        s.add_task(NewTask::new("Frame", d(2024, 1, 1), 0)),
        Err(ScheduleError::InvalidInput(_))
    ));
    assert!(matches!(
        s.add_task(NewTask::new("Frame", d(2024, 1, 1), 3).after([TaskId::generate()])),
        Err(ScheduleError::NotFound { .. })
    ));
    assert!(s.tasks().is_empty());
}

#[test]
fn same_day_adjacency_is_reported_as_violation() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 5);
    let b = add(&mut s, "B", d(2024, 1, 5), 2);

    let changes = s.create_dependency(a, b, None).unwrap();
    assert!(s.task(b).unwrap().depends_on(a));
    assert_eq!(changes.violations.len(), 1);
    let violation = &changes.violations[0];
    assert_eq!(violation.predecessor, a);
    assert_eq!(violation.successor, b);
    assert_eq!(violation.predecessor_end, d(2024, 1, 5));
    assert_eq!(violation.successor_start, d(2024, 1, 5));
    assert_eq!(s.dependency_violations().len(), 1);
}

#[test]
fn reverse_link_is_rejected_as_cycle() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 5);
    let b = add(&mut s, "B", d(2024, 1, 8), 2);
    s.create_dependency(a, b, None).unwrap();

    let before = s.tasks().to_vec();
    let err = s.create_dependency(b, a, None).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::CycleDetected {
            predecessor: b,
            successor: a
        }
    );
    assert_eq!(s.tasks(), before.as_slice());
    assert!(s.task(b).unwrap().depends_on(a));
}

#[test]
fn transitive_cycle_is_rejected() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 1);
    let b = add(&mut s, "B", d(2024, 1, 2), 1);
    let c = add(&mut s, "C", d(2024, 1, 3), 1);
    s.create_dependency(a, b, None).unwrap();
    s.create_dependency(b, c, None).unwrap();
    assert!(matches!(
        s.create_dependency(c, a, None),
        Err(ScheduleError::CycleDetected { .. })
    ));
}

#[test]
fn self_and_duplicate_links_are_invalid() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 1);
    let b = add(&mut s, "B", d(2024, 1, 8), 1);
    assert!(matches!(
        s.create_dependency(a, a, None),
        Err(ScheduleError::InvalidInput(_))
    ));
    s.create_dependency(a, b, None).unwrap();
    assert!(matches!(
        s.create_dependency(a, b, None),
        Err(ScheduleError::InvalidInput(_))
    ));
    assert!(matches!(
        s.create_dependency(a, TaskId::generate(), None),
        Err(ScheduleError::NotFound { .. })
    ));
}

#[test]
fn weekend_start_follows_calendar_policy() {
    let mut s = schedule();
    let snapped = add(&mut s, "Snapped", d(2024, 1, 6), 5);
    assert_eq!(s.task(snapped).unwrap().start_date, d(2024, 1, 8));
    assert_eq!(s.task(snapped).unwrap().end_date, d(2024, 1, 12));

    let mut calendar = WorkCalendar::default();
    calendar.set_weekend_start(WeekendStartPolicy::AnchorInPlace);
    let mut anchored = Schedule::new(ProjectMetadata::default(), calendar);
    let id = add(&mut anchored, "Anchored", d(2024, 1, 6), 5);
    assert_eq!(anchored.task(id).unwrap().start_date, d(2024, 1, 6));
    assert_eq!(anchored.task(id).unwrap().end_date, d(2024, 1, 12));
}

#[test]
fn stale_version_is_a_conflict_and_changes_nothing() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 5);
    s.move_task(a, d(2024, 1, 8), Some(1)).unwrap();
    assert_eq!(s.task(a).unwrap().version, 2);

    let before = s.task(a).unwrap().clone();
    let err = s.resize_task(a, 10, Some(1)).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::Conflict {
            task: a,
            expected: 1,
            actual: 2
        }
    );
    assert_eq!(s.task(a).unwrap(), &before);
}

#[test]
fn resize_is_idempotent() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 5);
    let first = s.resize_task(a, 8, None).unwrap();
    let after_first = s.task(a).unwrap().clone();
    let second = s.resize_task(a, 8, None).unwrap();

    assert_eq!(first.updated.len(), 1);
    assert!(second.is_empty());
    assert_eq!(s.task(a).unwrap(), &after_first);
    assert_eq!(after_first.start_date, d(2024, 1, 1));
    assert_eq!(after_first.end_date, d(2024, 1, 10));
}

#[test]
fn move_keeps_duration_and_reports_broken_edges_without_cascading() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 5);
    let b = add(&mut s, "B", d(2024, 1, 8), 3);
    s.create_dependency(a, b, None).unwrap();

    let changes = s.move_task(a, d(2024, 1, 8), None).unwrap();
    let moved = s.task(a).unwrap();
    assert_eq!(moved.duration_days, 5);
    assert_eq!(moved.end_date, d(2024, 1, 12));
    assert_eq!(s.task(b).unwrap().start_date, d(2024, 1, 8));
    assert_eq!(changes.violations.len(), 1);
    assert_eq!(changes.updated.len(), 1);
}

#[test]
fn delete_strips_task_from_dependents() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 2);
    let b = add(&mut s, "B", d(2024, 1, 8), 2);
    let c = add(&mut s, "C", d(2024, 1, 15), 2);
    s.create_dependency(a, b, None).unwrap();
    s.create_dependency(a, c, None).unwrap();
    s.create_dependency(b, c, None).unwrap();

    let changes = s.remove_task(a, None).unwrap();
    assert_eq!(changes.removed, vec![a]);
    assert_eq!(changes.updated.len(), 2);
    assert!(s.task(a).is_none());
    assert!(s.tasks().iter().all(|t| !t.depends_on(a)));
    assert!(s.task(c).unwrap().depends_on(b));
}

#[test]
fn removing_unknown_task_is_not_found() {
    let mut s = schedule();
    add(&mut s, "A", d(2024, 1, 1), 2);
    assert!(matches!(
        s.remove_task(TaskId::generate(), None),
        Err(ScheduleError::NotFound { .. })
    ));
    assert_eq!(s.tasks().len(), 1);
}

#[test]
fn remove_dependency_requires_existing_edge() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 2);
    let b = add(&mut s, "B", d(2024, 1, 8), 2);
    assert!(matches!(
        s.remove_dependency(a, b, None),
        Err(ScheduleError::DependencyNotFound { .. })
    ));
    s.create_dependency(a, b, None).unwrap();
    s.remove_dependency(a, b, None).unwrap();
    assert!(!s.task(b).unwrap().depends_on(a));
}

#[test]
fn update_task_patches_fields_and_clears_blank_text() {
    let mut s = schedule();
    let a = s
        .add_task(NewTask::new("A", d(2024, 1, 1), 2).notes("bring ladder"))
        .unwrap()
        .updated[0]
        .id;
    let patch = TaskPatch {
        name: Some("Drywall".into()),
        duration_days: Some(4),
        notes: Some("  ".into()),
        status: Some(TaskStatus::InProgress),
        ..TaskPatch::default()
    };
    s.update_task(a, patch, Some(1)).unwrap();
    let task = s.task(a).unwrap();
    assert_eq!(task.name, "Drywall");
    assert_eq!(task.end_date, d(2024, 1, 4));
    assert_eq!(task.notes, None);
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.version, 2);
}

#[test]
fn shift_dependents_pushes_downstream_tasks_past_predecessors() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 5);
    let b = add(&mut s, "B", d(2024, 1, 3), 2);
    let c = add(&mut s, "C", d(2024, 1, 9), 3);
    let unrelated = add(&mut s, "D", d(2024, 1, 1), 1);
    s.create_dependency(a, b, None).unwrap();
    s.create_dependency(b, c, None).unwrap();

    let changes = s.shift_dependents(a, None).unwrap();
    assert!(changes.violations.is_empty());
    // B: after Fri 01-05 -> Mon 01-08..Tue 01-09; C: after 01-09 -> Wed 01-10..Fri 01-12
    assert_eq!(s.task(b).unwrap().start_date, d(2024, 1, 8));
    assert_eq!(s.task(b).unwrap().end_date, d(2024, 1, 9));
    assert_eq!(s.task(c).unwrap().start_date, d(2024, 1, 10));
    assert_eq!(s.task(c).unwrap().end_date, d(2024, 1, 12));
    assert_eq!(s.task(unrelated).unwrap().version, 1);
    assert!(s.dependency_violations().is_empty());
}

#[test]
fn set_calendar_reprojects_every_task() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 6);
    assert_eq!(s.task(a).unwrap().end_date, d(2024, 1, 8));

    let mut calendar = WorkCalendar::default();
    calendar
        .set_working_days(&[
            chrono::Weekday::Mon,
            chrono::Weekday::Tue,
            chrono::Weekday::Wed,
            chrono::Weekday::Thu,
            chrono::Weekday::Fri,
            chrono::Weekday::Sat,
        ])
        .unwrap();
    let changes = s.set_calendar(calendar).unwrap();
    assert_eq!(changes.updated.len(), 1);
    assert_eq!(s.task(a).unwrap().end_date, d(2024, 1, 6));
}

#[test]
fn from_tasks_rejects_cycles_and_dangling_dependencies() {
    let mut s = schedule();
    let a = add(&mut s, "A", d(2024, 1, 1), 2);
    let b = add(&mut s, "B", d(2024, 1, 8), 2);
    s.create_dependency(a, b, None).unwrap();

    let mut cyclic = s.tasks().to_vec();
    cyclic[0].dependencies.push(b);
    assert!(
        Schedule::from_tasks(s.metadata().clone(), WorkCalendar::default(), cyclic).is_err()
    );

    let mut dangling = s.tasks().to_vec();
    dangling[0].dependencies.push(TaskId::generate());
    assert!(
        Schedule::from_tasks(s.metadata().clone(), WorkCalendar::default(), dangling).is_err()
    );

    let rebuilt =
        Schedule::from_tasks(s.metadata().clone(), WorkCalendar::default(), s.tasks().to_vec())
            .unwrap();
    assert_eq!(rebuilt.tasks(), s.tasks());
}

#[test]
fn metadata_dates_must_be_ordered() {
    let mut s = schedule();
    let mut metadata = s.metadata().clone();
    metadata.start_date = Some(d(2024, 2, 1));
    metadata.estimated_completion_date = Some(d(2024, 1, 1));
    assert!(s.set_metadata(metadata).is_err());
}
