use chrono::{Datelike, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Months fetched on each side of today
pub const DEFAULT_WINDOW_MONTHS: u32 = 2;

/// Inclusive date range requested from the timetable backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// `months` before and after `today`; days past a month's end are clamped
    pub fn around(today: NaiveDate, months: u32) -> Self {
        let months = Months::new(months);
        Self {
            start: today.checked_sub_months(months).unwrap_or(NaiveDate::MIN),
            end: today.checked_add_months(months).unwrap_or(NaiveDate::MAX),
        }
    }

    /// `months` around the local current date
    pub fn around_today(months: u32) -> Self {
        Self::around(Local::now().date_naive(), months)
    }

    /// `YYYYMMDD` as the backend expects it
    pub fn start_number(&self) -> u32 {
        date_number(self.start)
    }

    pub fn end_number(&self) -> u32 {
        date_number(self.end)
    }
}

fn date_number(date: NaiveDate) -> u32 {
    // Negative years never come out of `around`; clamp instead of wrapping.
    let year = u32::try_from(date.year()).unwrap_or(0);
    year * 10000 + date.month() * 100 + date.day()
}
