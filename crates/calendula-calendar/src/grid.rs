//! Month grid generation.
//!
//! A grid covers whole weeks: it starts on the configured first weekday on
//! or before the 1st and ends on the last weekday on or after the last day
//! of the month, so it always holds 28 to 42 days.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::Serialize;

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// First day of the displayed week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekStart(Weekday);

impl WeekStart {
    pub const SUNDAY: Self = Self(Weekday::Sun);
    pub const MONDAY: Self = Self(Weekday::Mon);

    pub fn new(weekday: Weekday) -> Self {
        Self(weekday)
    }

    /// 0 = Sunday .. 6 = Saturday. Anything else is `None`.
    pub fn from_index(index: u8) -> Option<Self> {
        if index > 6 {
            return None;
        }
        let weekday = (0..index).fold(Weekday::Sun, |day, _| day.succ());
        Some(Self(weekday))
    }

    pub fn weekday(self) -> Weekday {
        self.0
    }

    /// Days from Sunday, 0..=6.
    pub fn index(self) -> u32 {
        self.0.num_days_from_sunday()
    }
}

impl Default for WeekStart {
    fn default() -> Self {
        Self::SUNDAY
    }
}

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// `yyyy-MM-dd`
    pub iso: String,
    /// Whether the day belongs to the requested month.
    pub in_month: bool,
}

impl CalendarDay {
    fn new(date: NaiveDate, in_month: bool) -> Self {
        Self {
            date,
            iso: date.format("%Y-%m-%d").to_string(),
            in_month,
        }
    }
}

/// Fold an out-of-range zero-based month into the year, so month `12` of
/// 2023 is January 2024 and month `-1` of 2024 is December 2023.
pub fn normalize_month(year: i32, month0: i32) -> (i32, u32) {
    let total = i64::from(year) * 12 + i64::from(month0);
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12);
    (
        i32::try_from(year).unwrap_or(if year < 0 { i32::MIN } else { i32::MAX }),
        month0 as u32,
    )
}

/// First day of a (normalized) month, `None` outside chrono's date range.
pub fn first_of_month(year: i32, month0: i32) -> Option<NaiveDate> {
    let (year, month0) = normalize_month(year, month0);
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

/// Days of the month containing `year`/`month0`, padded to whole weeks.
///
/// Returns an empty grid only for years chrono cannot represent.
pub fn month_grid(year: i32, month0: i32, week_start: WeekStart) -> Vec<CalendarDay> {
    let Some(first) = first_of_month(year, month0) else {
        tracing::warn!("Month out of range: {}-{}", year, month0);
        return Vec::new();
    };
    let Some(last) = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
    else {
        return Vec::new();
    };

    let ws = week_start.index();
    let lead = (first.weekday().num_days_from_sunday() + 7 - ws) % 7;
    let week_end = (ws + 6) % 7;
    let trail = (week_end + 7 - last.weekday().num_days_from_sunday()) % 7;

    let (Some(start), Some(end)) = (
        first.checked_sub_days(Days::new(u64::from(lead))),
        last.checked_add_days(Days::new(u64::from(trail))),
    ) else {
        return Vec::new();
    };

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| {
            let in_month = day.year() == first.year() && day.month() == first.month();
            CalendarDay::new(day, in_month)
        })
        .collect()
}

/// Short weekday names in display order.
pub fn weekday_labels(week_start: WeekStart) -> [&'static str; 7] {
    let mut labels = WEEKDAY_LABELS;
    labels.rotate_left(week_start.index() as usize);
    labels
}
