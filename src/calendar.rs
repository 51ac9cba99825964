use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What to do with a task whose start date falls on a non-working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekendStartPolicy {
    /// Move the start forward to the first working day on or after it.
    #[default]
    SnapForward,
    /// Keep the start where it is. It counts as day zero and consumes no duration.
    AnchorInPlace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    holidays: HashSet<NaiveDate>,
    non_working_days: HashSet<Weekday>,
    weekend_start: WeekendStartPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    #[serde(default)]
    holidays: Vec<NaiveDate>,
    #[serde(default)]
    weekend_start: WeekendStartPolicy,
}

/// Monday to Friday, no holidays, weekend starts snap forward.
impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            holidays: HashSet::new(),
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
            weekend_start: WeekendStartPolicy::default(),
        }
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Mon-Fri calendar with US federal holidays for the given years (inclusive).
    pub fn with_us_holidays(start_year: i32, end_year: i32) -> Self {
        let (start, end) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };

        let mut calendar = Self::default();
        for year in start..=end {
            calendar.add_us_holidays(year);
        }
        calendar
    }

    pub fn custom<I, J>(working_days: I, holidays: J) -> ScheduleResult<Self>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = WorkCalendarConfig::new(working_days, holidays)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &WorkCalendarConfig) -> ScheduleResult<Self> {
        let working_set: HashSet<Weekday> = config.working_days.iter().copied().collect();
        if working_set.is_empty() {
            return Err(ScheduleError::invalid(
                "calendar requires at least one working day",
            ));
        }
        let non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !working_set.contains(day))
            .collect();

        Ok(Self {
            holidays: config.holidays.iter().copied().collect(),
            non_working_days,
            weekend_start: config.weekend_start,
        })
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    pub fn weekend_start(&self) -> WeekendStartPolicy {
        self.weekend_start
    }

    pub fn set_weekend_start(&mut self, policy: WeekendStartPolicy) {
        self.weekend_start = policy;
    }

    fn add_us_holidays(&mut self, year: i32) {
        let fixed = [(1, 1), (7, 4), (11, 11), (12, 25)];
        for (month, day) in fixed {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                self.holidays.insert(date);
            }
        }

        // MLK Day, Presidents' Day, Labor Day, Columbus Day, Thanksgiving
        let floating = [
            (1, Weekday::Mon, 3),
            (2, Weekday::Mon, 3),
            (9, Weekday::Mon, 1),
            (10, Weekday::Mon, 2),
            (11, Weekday::Thu, 4),
        ];
        for (month, weekday, n) in floating {
            if let Some(date) = NaiveDate::from_weekday_of_month_opt(year, month, weekday, n) {
                self.holidays.insert(date);
            }
        }

        // Memorial Day (last Monday in May)
        if let Some(date) = Self::last_weekday(year, 5, Weekday::Mon) {
            self.holidays.insert(date);
        }
    }

    fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
        let first_of_next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let mut date = first_of_next.pred_opt()?;
        while date.weekday() != weekday {
            date = date.pred_opt()?;
        }
        Some(date)
    }

    /// Add a single holiday
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates);
    }

    /// Add the same holiday for every year in the range, e.g. Dec 24 for 2025-2030.
    pub fn add_recurring_holiday(&mut self, month: u32, day: u32, start_year: i32, end_year: i32) {
        for year in start_year..=end_year {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                self.holidays.insert(date);
            }
        }
    }

    /// Set custom working days (e.g., Mon-Sat for 6-day weeks)
    pub fn set_working_days(&mut self, days: &[Weekday]) -> ScheduleResult<()> {
        if days.is_empty() {
            return Err(ScheduleError::invalid(
                "calendar requires at least one working day",
            ));
        }
        self.non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !days.contains(day))
            .collect();
        Ok(())
    }

    pub fn is_available(&self, date: NaiveDate) -> bool {
        !self.holidays.contains(&date) && !self.non_working_days.contains(&date.weekday())
    }

    fn day_after(date: NaiveDate) -> ScheduleResult<NaiveDate> {
        date.succ_opt()
            .ok_or_else(|| ScheduleError::invalid(format!("date {date} is out of range")))
    }

    /// First working day strictly after `from`.
    pub fn next_available(&self, from: NaiveDate) -> ScheduleResult<NaiveDate> {
        let mut current = Self::day_after(from)?;
        while !self.is_available(current) {
            current = Self::day_after(current)?;
        }
        Ok(current)
    }

    pub fn first_available_on_or_after(&self, from: NaiveDate) -> ScheduleResult<NaiveDate> {
        if self.is_available(from) {
            Ok(from)
        } else {
            self.next_available(from)
        }
    }

    /// Find a date N available days ahead
    pub fn find_next_available(&self, from: NaiveDate, days_ahead: u32) -> ScheduleResult<NaiveDate> {
        let mut current = from;
        let mut count = 0;

        while count < days_ahead {
            current = Self::day_after(current)?;
            if self.is_available(current) {
                count += 1;
            }
        }
        Ok(current)
    }

    /// Place a task of `duration_days` working days starting at `start`.
    ///
    /// Returns the stored start (after applying the weekend-start policy) and
    /// the inclusive end date, i.e. the `duration_days`-th working day counted
    /// from the first working day on or after `start`. A one-day task on a
    /// working day ends the day it starts.
    pub fn project(
        &self,
        start: NaiveDate,
        duration_days: u32,
    ) -> ScheduleResult<(NaiveDate, NaiveDate)> {
        if duration_days == 0 {
            return Err(ScheduleError::invalid(
                "duration must be at least one working day",
            ));
        }
        let first_working = self.first_available_on_or_after(start)?;
        let end = self.find_next_available(first_working, duration_days - 1)?;
        let anchored = match self.weekend_start {
            WeekendStartPolicy::SnapForward => first_working,
            WeekendStartPolicy::AnchorInPlace => start,
        };
        Ok((anchored, end))
    }

    /// Count available days in a date range (inclusive)
    pub fn count_available_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_available(*day))
            .count() as i64
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, holidays: J) -> ScheduleResult<Self>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        if working.is_empty() {
            return Err(ScheduleError::invalid(
                "calendar requires at least one working day",
            ));
        }
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup();

        let mut holidays: Vec<NaiveDate> = holidays.into_iter().collect();
        holidays.sort();
        holidays.dedup();

        Ok(Self {
            working_days: working,
            holidays,
            weekend_start: WeekendStartPolicy::default(),
        })
    }

    pub fn with_weekend_start(mut self, policy: WeekendStartPolicy) -> Self {
        self.weekend_start = policy;
        self
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }

    pub fn weekend_start(&self) -> WeekendStartPolicy {
        self.weekend_start
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let working = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !calendar.non_working_days.contains(day))
            .collect();

        let mut holidays: Vec<NaiveDate> = calendar.holidays.iter().copied().collect();
        holidays.sort();

        Self {
            working_days: working,
            holidays,
            weekend_start: calendar.weekend_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn config_round_trips_through_calendar() {
        let config = WorkCalendarConfig::new(
            [Weekday::Sat, Weekday::Mon, Weekday::Mon],
            [d(2024, 7, 4), d(2024, 7, 4)],
        )
        .unwrap()
        .with_weekend_start(WeekendStartPolicy::AnchorInPlace);
        assert_eq!(config.working_days(), &[Weekday::Mon, Weekday::Sat]);
        assert_eq!(config.holidays(), &[d(2024, 7, 4)]);

        let calendar = WorkCalendar::from_config(&config).unwrap();
        assert_eq!(calendar.to_config(), config);
    }

    #[test]
    fn empty_working_week_is_rejected() {
        assert!(WorkCalendarConfig::new([], []).is_err());
        let mut calendar = WorkCalendar::default();
        assert!(calendar.set_working_days(&[]).is_err());
    }

    #[test]
    fn us_holidays_cover_floating_dates() {
        let calendar = WorkCalendar::with_us_holidays(2025, 2025);
        // Memorial Day and Thanksgiving 2025
        assert!(!calendar.is_available(d(2025, 5, 26)));
        assert!(!calendar.is_available(d(2025, 11, 27)));
        assert!(calendar.is_available(d(2025, 11, 26)));
    }
}
