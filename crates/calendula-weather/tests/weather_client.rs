//! Integration tests for WeatherClient using wiremock.

use std::sync::Arc;
use std::time::Duration;

use calendula_weather::provider::local_noon_timestamp;
use calendula_weather::{ForecastCache, Location, WeatherClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATE: &str = "2024-01-15";

/// A three-hourly series around local noon of `DATE`.
fn series() -> serde_json::Value {
    let noon = local_noon_timestamp(DATE).unwrap();
    serde_json::json!({
        "list": [
            {"dt": noon - 6 * 3600, "weather": [{"description": "light rain", "icon": "10d"}]},
            {"dt": noon - 3600, "weather": [{"description": "clear sky", "icon": "01d"}]},
            {"dt": noon + 2 * 3600, "weather": [{"description": "few clouds", "icon": "02d"}]}
        ]
    })
}

fn client_for(server: &MockServer) -> WeatherClient {
    WeatherClient::new(Some("key".into()))
        .unwrap()
        .with_base_url(&server.uri())
}

#[tokio::test]
async fn test_picks_entry_closest_to_noon() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("appid", "key"))
        .and(query_param("units", "metric"))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(series()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let forecast = client
        .get_forecast_by_coords(40.7128, -74.006, DATE)
        .await
        .unwrap();

    assert_eq!(forecast.summary, "clear sky");
    assert_eq!(forecast.icon.as_deref(), Some("01d"));
}

#[tokio::test]
async fn test_nearby_coordinates_share_cache_entry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(series()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let first = client.get_forecast_by_coords(40.71281, -74.00601, DATE).await;
    let second = client.get_forecast_by_coords(40.71279, -74.00598, DATE).await;

    assert!(first.is_some());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_entry_triggers_new_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(series()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(ForecastCache::new(Duration::from_millis(50), 16));
    let client = client_for(&mock_server).with_cache(cache);

    client.get_forecast_by_coords(1.0, 2.0, DATE).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    client.get_forecast_by_coords(1.0, 2.0, DATE).await;
}

#[tokio::test]
async fn test_failure_is_cached_as_none() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert_eq!(client.get_forecast_by_coords(1.0, 2.0, DATE).await, None);
    assert_eq!(client.get_forecast_by_coords(1.0, 2.0, DATE).await, None);
    assert_eq!(client.cache().len(), 1);
}

#[tokio::test]
async fn test_empty_series_is_none() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"list": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert_eq!(client.get_forecast_by_coords(1.0, 2.0, DATE).await, None);
    assert_eq!(client.get_forecast_by_coords(1.0, 2.0, DATE).await, None);
}

#[tokio::test]
async fn test_forecast_for_location_and_city() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "New York"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "New York", "country": "US", "state": "New York", "lat": 40.7128, "lon": -74.006}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(series()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let by_city = client.get_forecast("New York", DATE).await.unwrap();

    let location = Location {
        name: "New York".into(),
        country: "US".into(),
        state: Some("New York".into()),
        lat: 40.7128,
        lon: -74.006,
    };
    let by_location = client.get_forecast(location, DATE).await.unwrap();

    assert_eq!(by_city.as_ref().map(|f| f.summary.as_str()), Some("clear sky"));
    assert_eq!(by_city, by_location);
}

#[tokio::test]
async fn test_unknown_city_is_none() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert_eq!(client.get_forecast("Atlantis", DATE).await.unwrap(), None);
}

#[tokio::test]
async fn test_city_geocoding_error_propagates() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert!(client.get_forecast("Lisbon", DATE).await.is_err());
}
