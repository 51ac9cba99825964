use chrono::{Datelike, NaiveDate, Weekday};
use proptest::prelude::*;
use site_schedule::{WeekendStartPolicy, WorkCalendar, WorkCalendarConfig};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn default_calendar_weekends_unavailable() {
    let cal = WorkCalendar::default();
    // 2024-01-06 is a Saturday, 2024-01-07 a Sunday
    assert!(!cal.is_available(d(2024, 1, 6)));
    assert!(!cal.is_available(d(2024, 1, 7)));
    assert!(cal.is_available(d(2024, 1, 1)));
}

#[test]
fn next_available_skips_weekend() {
    let cal = WorkCalendar::default();
    let next = cal.next_available(d(2024, 1, 5)).unwrap();
    assert_eq!(next.weekday(), Weekday::Mon);
    assert_eq!(next, d(2024, 1, 8));
}

#[test]
fn five_day_task_from_monday_ends_friday() {
    let cal = WorkCalendar::default();
    assert_eq!(
        cal.project(d(2024, 1, 1), 5).unwrap(),
        (d(2024, 1, 1), d(2024, 1, 5))
    );
}

#[test]
fn one_day_task_ends_the_day_it_starts() {
    let cal = WorkCalendar::default();
    assert_eq!(
        cal.project(d(2024, 1, 3), 1).unwrap(),
        (d(2024, 1, 3), d(2024, 1, 3))
    );
}

#[test]
fn weekend_start_snaps_forward_by_default() {
    let cal = WorkCalendar::default();
    assert_eq!(
        cal.project(d(2024, 1, 6), 5).unwrap(),
        (d(2024, 1, 8), d(2024, 1, 12))
    );
}

#[test]
fn weekend_start_can_be_anchored() {
    let mut cal = WorkCalendar::default();
    cal.set_weekend_start(WeekendStartPolicy::AnchorInPlace);
    assert_eq!(
        cal.project(d(2024, 1, 6), 5).unwrap(),
        (d(2024, 1, 6), d(2024, 1, 12))
    );
}

#[test]
fn zero_duration_is_rejected() {
    let cal = WorkCalendar::default();
    assert!(cal.project(d(2024, 1, 1), 0).is_err());
}

#[test]
fn holidays_are_skipped() {
    let mut cal = WorkCalendar::default();
    cal.add_holiday(d(2024, 1, 3));
    assert_eq!(cal.project(d(2024, 1, 1), 3).unwrap().1, d(2024, 1, 4));
}

#[test]
fn set_working_days_includes_saturday() {
    let mut cal = WorkCalendar::default();
    cal.set_working_days(&[
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ])
    .unwrap();
    assert!(cal.is_available(d(2024, 1, 6)));
    assert!(!cal.is_available(d(2024, 1, 7)));
    assert_eq!(cal.project(d(2024, 1, 1), 6).unwrap().1, d(2024, 1, 6));
}

#[test]
fn empty_working_week_is_rejected() {
    let mut cal = WorkCalendar::default();
    assert!(cal.set_working_days(&[]).is_err());
    assert!(WorkCalendarConfig::new(Vec::<Weekday>::new(), Vec::<NaiveDate>::new()).is_err());
}

#[test]
fn count_available_days_over_two_weeks() {
    let cal = WorkCalendar::default();
    assert_eq!(cal.count_available_days(d(2024, 1, 1), d(2024, 1, 14)), 10);
}

#[test]
fn config_survives_json() {
    let mut cal = WorkCalendar::default();
    cal.add_holiday(d(2024, 12, 25));
    cal.set_weekend_start(WeekendStartPolicy::AnchorInPlace);
    let json = serde_json::to_string(&cal.to_config()).unwrap();
    let config: WorkCalendarConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(WorkCalendar::from_config(&config).unwrap(), cal);
}

proptest! {
    #[test]
    fn projected_end_spans_exactly_duration_working_days(
        offset in 0i64..3_000,
        duration in 1u32..200,
    ) {
        let cal = WorkCalendar::default();
        let start = d(2020, 1, 1) + chrono::Duration::days(offset);
        let (stored_start, end) = cal.project(start, duration).unwrap();
        prop_assert!(end >= stored_start);
        prop_assert!(cal.is_available(end));
        prop_assert!(cal.is_available(stored_start));
        prop_assert_eq!(cal.count_available_days(stored_start, end), i64::from(duration));
    }
}
