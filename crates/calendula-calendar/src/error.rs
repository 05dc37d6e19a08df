//! Calendar-specific error types.

use thiserror::Error;

use crate::reminder::ValidationError;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Reminder not found: {0}")]
    ReminderNotFound(String),

    #[error("Only an existing reminder can be deleted")]
    NotEditing,

    #[error("Invalid reminder: {0}")]
    Validation(#[from] ValidationError),
}

impl CalendarError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::ReminderNotFound(_) => "Reminder not found".to_string(),
            Self::NotEditing => "This reminder has not been saved yet.".to_string(),
            Self::Validation(e) => e.user_message(),
        }
    }
}
