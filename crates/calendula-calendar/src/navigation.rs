//! The displayed month and navigation between months.

use chrono::{Datelike, Local, NaiveDate};

use crate::grid::{self, CalendarDay, WeekStart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    year: i32,
    /// 0 = January .. 11 = December
    month0: u32,
}

impl MonthCursor {
    /// Cursor on `year`/`month0`; out-of-range months roll into the year.
    pub fn new(year: i32, month0: i32) -> Self {
        let (year, month0) = grid::normalize_month(year, month0);
        Self { year, month0 }
    }

    /// Cursor on the month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    /// Cursor on the current local month.
    pub fn today() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month0(&self) -> u32 {
        self.month0
    }

    /// Advance one month. At the last representable year the cursor stays put.
    pub fn next_month(&mut self) {
        if self.month0 < 11 {
            self.month0 += 1;
        } else if let Some(year) = self.year.checked_add(1) {
            self.year = year;
            self.month0 = 0;
        }
    }

    /// Step back one month. At the first representable year the cursor stays put.
    pub fn prev_month(&mut self) {
        if self.month0 > 0 {
            self.month0 -= 1;
        } else if let Some(year) = self.year.checked_sub(1) {
            self.year = year;
            self.month0 = 11;
        }
    }

    pub fn go_today(&mut self) {
        *self = Self::today();
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1)
    }

    /// Header text such as "March 2024".
    pub fn label(&self) -> String {
        match self.first_day() {
            Some(first) => first.format("%B %Y").to_string(),
            None => format!("{}-{:02}", self.year, self.month0 + 1),
        }
    }

    pub fn grid(&self, week_start: WeekStart) -> Vec<CalendarDay> {
        grid::month_grid(self.year, self.month0 as i32, week_start)
    }
}

impl Default for MonthCursor {
    fn default() -> Self {
        Self::today()
    }
}
