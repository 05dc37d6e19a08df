use calendula_core::error::{NetworkError, ReqwestErrorExt};
use serde::{Deserialize, Serialize};

/// A geocoding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Forecast summary attached to a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Forecast {
    pub fn new(summary: impl Into<String>, icon: Option<String>) -> Self {
        Self {
            summary: summary.into(),
            icon,
        }
    }
}

/// What to fetch a forecast for.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastTarget {
    /// Already geocoded coordinates.
    Location(Location),
    /// Free-text city, geocoded before the forecast lookup.
    City(String),
}

impl From<Location> for ForecastTarget {
    fn from(location: Location) -> Self {
        Self::Location(location)
    }
}

impl From<&str> for ForecastTarget {
    fn from(city: &str) -> Self {
        Self::City(city.to_string())
    }
}

/// One entry of the `/data/2.5/forecast` series.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ForecastEntry {
    /// Unix timestamp, seconds.
    pub dt: i64,
    #[serde(default)]
    pub weather: Vec<WeatherDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WeatherDescription {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
}

/// Weather and geocoding errors.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Request failed with status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.into_network_error())
    }
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(e) => e.user_message(),
            Self::Status(401) => "Weather API key is invalid. Check settings.",
            Self::Status(_) => "City search failed. Please try again.",
            Self::Parse(_) => "Received an unexpected response. Please try again.",
        }
    }
}
