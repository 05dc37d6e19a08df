//! Weather and geocoding for Calendula
//!
//! Thin OpenWeatherMap clients: city search for the reminder form and a
//! noon forecast per reminder date, backed by a short-lived in-memory cache.
//! Without an API key both clients degrade to offline behavior instead of
//! failing.

pub mod cache;
pub mod geocode;
pub mod provider;
pub mod types;

pub use cache::{CacheKey, ForecastCache};
pub use geocode::{label, GeocodingClient};
pub use provider::{icon_url, WeatherClient};
pub use types::{Forecast, ForecastTarget, Location, WeatherError};
