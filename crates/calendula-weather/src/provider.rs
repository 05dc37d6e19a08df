//! Forecast lookups against the OpenWeatherMap 5-day / 3-hour series.

use chrono::{Local, NaiveDate, TimeZone};
use reqwest::Client;
use std::sync::Arc;
use tracing::instrument;

use crate::cache::{CacheKey, ForecastCache};
use crate::geocode::{self, GeocodingClient, DEFAULT_BASE_URL};
use crate::types::{Forecast, ForecastEntry, ForecastResponse, ForecastTarget, WeatherError};

/// Summary returned when no API key is configured.
pub const MOCK_SUMMARY: &str = "weather preview (mock)";

/// Summary used when the chosen entry carries no description.
pub const MISSING_SUMMARY: &str = "—";

const ICON_URL_BASE: &str = "https://openweathermap.org/img/wn";

/// URL of the 2x icon image for an icon id, or an empty string without one.
pub fn icon_url(icon: Option<&str>) -> String {
    match icon {
        Some(id) if !id.is_empty() => format!("{}/{}@2x.png", ICON_URL_BASE, id),
        _ => String::new(),
    }
}

/// Local noon of a `yyyy-MM-dd` date as a Unix timestamp (seconds).
pub fn local_noon_timestamp(date_iso: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date_iso, "%Y-%m-%d").ok()?;
    let noon = date.and_hms_opt(12, 0, 0)?;
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Pick the entry closest to `target`. Ties keep the earlier entry; without a
/// target the first entry wins.
pub(crate) fn closest_entry(entries: &[ForecastEntry], target: Option<i64>) -> Option<&ForecastEntry> {
    let first = entries.first()?;
    let Some(target) = target else {
        return Some(first);
    };

    let mut best = first;
    let mut best_diff = u64::MAX;
    for entry in entries {
        let diff = entry.dt.abs_diff(target);
        if diff < best_diff {
            best_diff = diff;
            best = entry;
        }
    }
    Some(best)
}

fn summarize(entry: &ForecastEntry) -> Forecast {
    let first = entry.weather.first();
    let summary = first
        .and_then(|w| w.description.clone())
        .unwrap_or_else(|| MISSING_SUMMARY.to_string());
    let icon = first.and_then(|w| w.icon.clone());
    Forecast { summary, icon }
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    api_key: Option<String>,
    base_url: String,
    cache: Arc<ForecastCache>,
    geocoder: GeocodingClient,
}

impl WeatherClient {
    /// Create a client with a fresh cache. Without an API key every lookup
    /// returns the offline preview forecast.
    pub fn new(api_key: Option<String>) -> Result<Self, WeatherError> {
        let client = Arc::new(geocode::http_client()?);
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let geocoder = GeocodingClient::with_client(client.clone(), api_key.clone());

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: Arc::new(ForecastCache::default()),
            geocoder,
        })
    }

    /// Point the client (and its geocoder) at another host.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.geocoder = self.geocoder.with_base_url(base_url);
        self
    }

    /// Share an existing cache.
    pub fn with_cache(mut self, cache: Arc<ForecastCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<ForecastCache> {
        &self.cache
    }

    pub fn geocoder(&self) -> &GeocodingClient {
        &self.geocoder
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn mock_forecast() -> Forecast {
        Forecast::new(MOCK_SUMMARY, None)
    }

    /// Forecast for the given coordinates on `date_iso`, closest to local noon.
    ///
    /// Never fails: HTTP errors and empty series resolve to `None`, and both
    /// outcomes are cached for the cache TTL.
    #[instrument(skip(self), level = "info")]
    pub async fn get_forecast_by_coords(&self, lat: f64, lon: f64, date_iso: &str) -> Option<Forecast> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Some(Self::mock_forecast());
        };

        let key = CacheKey::new(lat, lon, date_iso);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Forecast cache hit: {}", key.as_str());
            return cached;
        }

        let result = self.fetch(api_key, lat, lon, date_iso).await;
        self.cache.insert(key, result.clone());
        result
    }

    async fn fetch(&self, api_key: &str, lat: f64, lon: f64, date_iso: &str) -> Option<Forecast> {
        let url = format!(
            "{}/data/2.5/forecast?lat={}&lon={}&appid={}&units=metric&lang=en",
            self.base_url, lat, lon, api_key,
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Forecast request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Forecast returned status {}", response.status());
            return None;
        }

        let body: ForecastResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Forecast parse error: {}", e);
                return None;
            }
        };

        let target = local_noon_timestamp(date_iso);
        let forecast = closest_entry(&body.list, target).map(summarize);
        if forecast.is_none() {
            tracing::debug!("Forecast series empty for {}", date_iso);
        }
        forecast
    }

    /// Forecast for a location or a free-text city.
    ///
    /// A city is geocoded first (one result); geocoding errors propagate and
    /// an unknown city resolves to `None`.
    #[instrument(skip(self, target), level = "info")]
    pub async fn get_forecast(
        &self,
        target: impl Into<ForecastTarget>,
        date_iso: &str,
    ) -> Result<Option<Forecast>, WeatherError> {
        match target.into() {
            ForecastTarget::Location(loc) => {
                Ok(self.get_forecast_by_coords(loc.lat, loc.lon, date_iso).await)
            }
            ForecastTarget::City(city) => {
                if !self.has_credential() {
                    return Ok(Some(Self::mock_forecast()));
                }
                let hit = self.geocoder.search_cities(&city, 1).await?.into_iter().next();
                match hit {
                    Some(loc) => Ok(self.get_forecast_by_coords(loc.lat, loc.lon, date_iso).await),
                    None => Ok(None),
                }
            }
        }
    }
}
