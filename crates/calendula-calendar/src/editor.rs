//! Reminder form state: the draft being edited and its forecast lookup.
//!
//! The forecast follows the draft's location and date. Setting both starts a
//! request; clearing either drops the forecast. Every request carries a
//! generation number and a result is only applied if its generation is
//! still the latest, so a slow response cannot overwrite a newer one.

use calendula_weather::{Forecast, Location, WeatherClient};

use crate::error::CalendarError;
use crate::reminder::{validate, Reminder, ValidationError};
use crate::store::ReminderStore;

/// Forecast lookup state for the open draft.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ForecastState {
    /// Location or date missing.
    #[default]
    NotRequested,
    /// Waiting for the result of request `generation`.
    Fetching { generation: u64 },
    /// Lookup finished; `None` means no forecast is available.
    Resolved(Option<Forecast>),
}

impl ForecastState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ForecastState::Fetching { .. })
    }
}

/// What to fetch for the current draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub generation: u64,
    pub lat: f64,
    pub lon: f64,
    pub date_iso: String,
}

#[derive(Debug, Clone)]
pub struct ReminderEditor {
    draft: Reminder,
    editing: bool,
    forecast: ForecastState,
    generation: u64,
}

impl ReminderEditor {
    /// A new reminder on `date_iso` (may be empty).
    pub fn create(date_iso: impl Into<String>) -> Self {
        Self {
            draft: Reminder::draft(date_iso),
            editing: false,
            forecast: ForecastState::NotRequested,
            generation: 0,
        }
    }

    /// Open the stored reminder `id` for editing.
    pub fn edit(store: &ReminderStore, id: &str) -> Result<Self, CalendarError> {
        let reminder = store
            .get(id)
            .cloned()
            .ok_or_else(|| CalendarError::ReminderNotFound(id.to_string()))?;
        let forecast = match &reminder.weather {
            Some(weather) => ForecastState::Resolved(Some(weather.clone())),
            None => ForecastState::NotRequested,
        };
        Ok(Self {
            draft: reminder,
            editing: true,
            forecast,
            generation: 0,
        })
    }

    pub fn draft(&self) -> &Reminder {
        &self.draft
    }

    /// True when the draft was opened from the store.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn forecast_state(&self) -> &ForecastState {
        &self.forecast
    }

    pub fn is_loading(&self) -> bool {
        self.forecast.is_loading()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn set_time(&mut self, time: impl Into<String>) {
        self.draft.time = time.into();
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.draft.color = color.into();
    }

    pub fn set_city(&mut self, city: impl Into<String>) {
        self.draft.city = city.into();
    }

    pub fn set_date(&mut self, date_iso: impl Into<String>) {
        let date_iso = date_iso.into();
        if date_iso == self.draft.date_iso {
            return;
        }
        self.draft.date_iso = date_iso;
        self.target_changed();
    }

    pub fn set_location(&mut self, location: Option<Location>) {
        if location == self.draft.loc {
            return;
        }
        self.draft.loc = location;
        self.target_changed();
    }

    fn target_changed(&mut self) {
        self.generation += 1;
        if self.draft.loc.is_some() && !self.draft.date_iso.is_empty() {
            tracing::debug!("Forecast request {} started", self.generation);
            self.forecast = ForecastState::Fetching {
                generation: self.generation,
            };
        } else {
            self.forecast = ForecastState::NotRequested;
            self.draft.weather = None;
        }
    }

    /// The lookup to perform, while one is outstanding.
    pub fn pending_request(&self) -> Option<ForecastRequest> {
        let ForecastState::Fetching { generation } = self.forecast else {
            return None;
        };
        let loc = self.draft.loc.as_ref()?;
        Some(ForecastRequest {
            generation,
            lat: loc.lat,
            lon: loc.lon,
            date_iso: self.draft.date_iso.clone(),
        })
    }

    /// Apply the result of request `generation`. Stale results are dropped
    /// and `false` is returned.
    pub fn apply_forecast(&mut self, generation: u64, forecast: Option<Forecast>) -> bool {
        if self.forecast != (ForecastState::Fetching { generation }) {
            tracing::debug!(
                "Discarding forecast for request {} (latest is {})",
                generation,
                self.generation
            );
            return false;
        }
        self.draft.weather = forecast.clone();
        self.forecast = ForecastState::Resolved(forecast);
        true
    }

    /// Run the outstanding lookup, if any, against `client`.
    pub async fn load_forecast(&mut self, client: &WeatherClient) -> bool {
        let Some(request) = self.pending_request() else {
            return false;
        };
        let forecast = client
            .get_forecast_by_coords(request.lat, request.lon, &request.date_iso)
            .await;
        self.apply_forecast(request.generation, forecast)
    }

    /// Validate and save the draft. The city label follows the selected
    /// location.
    pub fn submit(&mut self, store: &mut ReminderStore) -> Result<Reminder, ValidationError> {
        validate(&self.draft)?;
        self.draft.sync_city();
        store.upsert(self.draft.clone());
        self.editing = true;
        tracing::info!("Saved reminder {} on {}", self.draft.id, self.draft.date_iso);
        Ok(self.draft.clone())
    }

    /// Delete the reminder being edited.
    pub fn delete(&self, store: &mut ReminderStore) -> Result<(), CalendarError> {
        if !self.editing {
            return Err(CalendarError::NotEditing);
        }
        if !store.remove(&self.draft.id) {
            return Err(CalendarError::ReminderNotFound(self.draft.id.clone()));
        }
        tracing::info!("Deleted reminder {}", self.draft.id);
        Ok(())
    }
}
