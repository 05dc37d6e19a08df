//! Calendar side of Calendula.
//!
//! Month grids and navigation, the reminder model, the reminder store and the
//! reminder form with its forecast lookup.

pub mod editor;
pub mod error;
pub mod grid;
pub mod navigation;
pub mod reminder;
pub mod store;

pub use editor::{ForecastRequest, ForecastState, ReminderEditor};
pub use error::CalendarError;
pub use grid::{month_grid, weekday_labels, CalendarDay, WeekStart};
pub use navigation::MonthCursor;
pub use reminder::{validate, Reminder, ValidationError};
pub use store::ReminderStore;
