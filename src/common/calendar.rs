// src/common/calendar.rs

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::db::query::Predicate;

/// Wall-clock "now" in the reporting timezone. Every window is computed from this value.
#[derive(Debug, Clone, Copy)]
pub struct ReportClock {
    tz: Tz,
}

impl ReportClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }
}

/// A reporting window relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Midnight today up to the reference instant.
    Today,
    /// Midnight yesterday up to midnight today.
    Yesterday,
    /// First of this month up to the reference instant.
    CurrentMonth,
    /// The whole calendar month `n` months before the current one (n >= 1).
    MonthsAgo(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub end_inclusive: bool,
}

impl TimeRange {
    pub fn predicate(&self, column: &'static str, name: &str) -> Predicate {
        if self.end_inclusive {
            Predicate::closed(column, name, self.start, self.end)
        } else {
            Predicate::half_open(column, name, self.start, self.end)
        }
    }
}

impl Window {
    pub fn range(self, as_of: NaiveDateTime) -> TimeRange {
        let today = as_of.date();
        let this_month = first_of_month(today);
        match self {
            Window::Today => TimeRange { start: midnight(today), end: as_of, end_inclusive: true },
            Window::Yesterday => TimeRange {
                start: midnight(today.pred_opt().unwrap_or(today)),
                end: midnight(today),
                end_inclusive: false,
            },
            Window::CurrentMonth => TimeRange { start: midnight(this_month), end: as_of, end_inclusive: true },
            Window::MonthsAgo(n) => {
                let start = months_back(this_month, n);
                let end = months_back(this_month, n.saturating_sub(1));
                TimeRange { start: midnight(start), end: midnight(end), end_inclusive: false }
            }
        }
    }

    /// Calendar month the window starts in.
    pub fn year_month(self, as_of: NaiveDateTime) -> (i32, u32) {
        let start = self.range(as_of).start.date();
        (start.year(), start.month())
    }
}

/// The current month followed by the `count` prior months, oldest first.
pub fn monthly_windows(count: u32) -> Vec<Window> {
    std::iter::once(Window::CurrentMonth)
        .chain((1..=count).rev().map(Window::MonthsAgo))
        .collect()
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn months_back(first: NaiveDate, n: u32) -> NaiveDate {
    first.checked_sub_months(Months::new(n)).unwrap_or(NaiveDate::MIN)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
    NAMES.get(month.wrapping_sub(1) as usize).copied().unwrap_or("")
}
