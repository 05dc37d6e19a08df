//! Reminder model and form validation.

use calendula_weather::{label, Forecast, Location};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TIME: &str = "09:00";
pub const DEFAULT_COLOR: &str = "#3b82f6";

/// Longest accepted reminder text, in characters after trimming.
pub const MAX_TEXT_CHARS: usize = 30;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// A note attached to a calendar day.
///
/// Serialized with the field names the persisted `calendar-reminders` array
/// uses, including `dateISO`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    #[serde(rename = "dateISO")]
    pub date_iso: String,
    /// Zero-padded `HH:MM`
    pub time: String,
    pub text: String,
    #[serde(default)]
    pub city: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub loc: Option<Location>,
    #[serde(default)]
    pub weather: Option<Forecast>,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Reminder {
    /// A blank reminder for `date_iso` with a fresh id and form defaults.
    pub fn draft(date_iso: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date_iso: date_iso.into(),
            time: DEFAULT_TIME.to_string(),
            text: String::new(),
            city: String::new(),
            color: default_color(),
            loc: None,
            weather: None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.date_iso)
    }

    /// Copy the selected location's label into `city`, if one is selected.
    pub fn sync_city(&mut self) {
        if let Some(loc) = &self.loc {
            self.city = label(loc);
        }
    }
}

/// Why a draft cannot be saved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Reminder text is empty")]
    EmptyText,

    #[error("Reminder text is {len} characters, max {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    #[error("Invalid time: {0:?}")]
    InvalidTime(String),
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyText => "Please enter a reminder.".to_string(),
            Self::TextTooLong { max, .. } => format!("Keep it to {} characters or fewer.", max),
            Self::InvalidDate(_) => "Pick a valid date.".to_string(),
            Self::InvalidTime(_) => "Pick a valid time.".to_string(),
        }
    }
}

/// Strict `yyyy-MM-dd`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Strict zero-padded `HH:MM`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    if value.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(value, TIME_FORMAT).ok()
}

/// Check a draft before it reaches the store.
pub fn validate(reminder: &Reminder) -> Result<(), ValidationError> {
    let text = reminder.text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    let len = text.chars().count();
    if len > MAX_TEXT_CHARS {
        return Err(ValidationError::TextTooLong {
            len,
            max: MAX_TEXT_CHARS,
        });
    }
    if parse_date(&reminder.date_iso).is_none() {
        return Err(ValidationError::InvalidDate(reminder.date_iso.clone()));
    }
    if parse_time(&reminder.time).is_none() {
        return Err(ValidationError::InvalidTime(reminder.time.clone()));
    }
    Ok(())
}
