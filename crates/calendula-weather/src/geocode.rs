//! Forward geocoding: free-text city query to candidate locations.
//! Uses the OpenWeatherMap direct geocoding endpoint.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::types::{Location, WeatherError};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_LIMIT: u32 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Calendula/0.1.0";

/// Build the HTTP client shared by the geocoding and weather clients.
pub(crate) fn http_client() -> Result<Client, WeatherError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

/// Display label for a location: name, state (when present), country.
///
/// `label(Tokyo, JP)` is `"Tokyo, JP"`; empty parts are skipped.
pub fn label(location: &Location) -> String {
    [
        Some(location.name.as_str()),
        location.state.as_deref(),
        Some(location.country.as_str()),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Arc<Client>,
    api_key: Option<String>,
    base_url: String,
}

impl GeocodingClient {
    /// Create a client. Without an API key every search returns no results.
    pub fn new(api_key: Option<String>) -> Result<Self, WeatherError> {
        Ok(Self::with_client(Arc::new(http_client()?), api_key))
    }

    pub(crate) fn with_client(client: Arc<Client>, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at another host (mock servers, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search cities matching `query`, at most `limit` results.
    ///
    /// A blank query or a missing API key returns an empty list without
    /// touching the network. HTTP failures are returned as errors and are
    /// not retried.
    #[instrument(skip(self), level = "info")]
    pub async fn search_cities(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Location>, WeatherError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/geo/1.0/direct?q={}&limit={}&appid={}",
            self.base_url,
            urlencoding::encode(query),
            limit,
            api_key,
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Geocoding returned status {}", status);
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let locations: Option<Vec<Location>> = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Parse(format!("geocoding response: {}", e)))?;
        let locations = locations.unwrap_or_default();

        tracing::debug!("Geocoding '{}' matched {} location(s)", query, locations.len());
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tokyo() -> Location {
        Location {
            name: "Tokyo".into(),
            country: "JP".into(),
            state: None,
            lat: 35.6828,
            lon: 139.759,
        }
    }

    #[test]
    fn test_label_without_state() {
        assert_eq!(label(&tokyo()), "Tokyo, JP");
    }

    #[test]
    fn test_label_with_state() {
        let berlin = Location {
            name: "Berlin".into(),
            country: "DE".into(),
            state: Some("Berlin".into()),
            lat: 52.52,
            lon: 13.405,
        };
        assert_eq!(label(&berlin), "Berlin, Berlin, DE");
    }

    #[test]
    fn test_label_skips_empty_parts() {
        let loc = Location {
            state: Some(String::new()),
            country: String::new(),
            ..tokyo()
        };
        assert_eq!(label(&loc), "Tokyo");
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(Some("key".into()))
            .unwrap()
            .with_base_url(&mock_server.uri());

        assert!(client.search_cities("", DEFAULT_LIMIT).await.unwrap().is_empty());
        assert!(client.search_cities("   ", DEFAULT_LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(None)
            .unwrap()
            .with_base_url(&mock_server.uri());

        assert!(!client.has_credential());
        assert!(client.search_cities("Tokyo", DEFAULT_LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_maps_locations() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "São Paulo"))
            .and(query_param("limit", "5"))
            .and(query_param("appid", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "São Paulo", "country": "BR", "state": "São Paulo", "lat": -23.55, "lon": -46.63},
                {"name": "São Paulo", "country": "BR", "lat": -23.5, "lon": -46.6}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(Some("key".into()))
            .unwrap()
            .with_base_url(&mock_server.uri());
        let results = client.search_cities("São Paulo", DEFAULT_LIMIT).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].state.as_deref(), Some("São Paulo"));
        assert_eq!(results[1].state, None);
        assert_eq!(label(&results[0]), "São Paulo, São Paulo, BR");
    }

    #[tokio::test]
    async fn test_null_body_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(Some("key".into()))
            .unwrap()
            .with_base_url(&mock_server.uri());

        assert!(client.search_cities("Nowhere", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_failure_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(Some("key".into()))
            .unwrap()
            .with_base_url(&mock_server.uri());
        let result = client.search_cities("Tokyo", DEFAULT_LIMIT).await;

        assert!(matches!(result, Err(WeatherError::Status(500))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(Some("key".into()))
            .unwrap()
            .with_base_url(&mock_server.uri());
        let result = client.search_cities("Tokyo", DEFAULT_LIMIT).await;

        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }
}
