//! End-to-end reminder flow: form, forecast lookup, store and persistence.

use std::sync::Arc;

use calendula_calendar::{ForecastState, MonthCursor, ReminderEditor, ReminderStore, WeekStart};
use calendula_core::storage::REMINDERS_KEY;
use calendula_core::{DeferredWriter, KeyValueStore, SqliteStore};
use calendula_weather::provider::local_noon_timestamp;
use calendula_weather::{Location, WeatherClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lisbon() -> Location {
    Location {
        name: "Lisbon".into(),
        country: "PT".into(),
        state: None,
        lat: 38.7223,
        lon: -9.1393,
    }
}

#[tokio::test]
async fn test_create_with_forecast_and_reload() {
    let mock_server = MockServer::start().await;
    let noon = local_noon_timestamp("2024-03-10").unwrap();
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [
                {"dt": noon - 9 * 3600, "weather": [{"description": "mist", "icon": "50n"}]},
                {"dt": noon, "weather": [{"description": "scattered clouds", "icon": "03d"}]}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = WeatherClient::new(Some("key".into()))
        .unwrap()
        .with_base_url(&mock_server.uri());

    let backing: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::in_memory().unwrap());
    let writer = DeferredWriter::new(backing.clone());
    let mut store = ReminderStore::load(backing.as_ref());
    store.persist_to(writer.clone());

    let mut editor = ReminderEditor::create("2024-03-10");
    editor.set_text("Walk by the river");
    editor.set_location(Some(lisbon()));
    assert!(editor.is_loading());
    assert!(editor.load_forecast(&client).await);
    assert!(matches!(editor.forecast_state(), ForecastState::Resolved(Some(_))));

    let saved = editor.submit(&mut store).unwrap();
    assert_eq!(saved.city, "Lisbon, PT");
    assert_eq!(saved.weather.as_ref().unwrap().summary, "scattered clouds");

    writer.flush().unwrap();
    let raw = backing.get(REMINDERS_KEY).unwrap().unwrap();
    assert!(raw.contains("\"dateISO\":\"2024-03-10\""));

    let reloaded = ReminderStore::load(backing.as_ref());
    assert_eq!(reloaded.items(), store.items());

    let cursor = MonthCursor::new(2024, 2);
    assert_eq!(reloaded.by_month(cursor.year(), cursor.month0() as i32).len(), 1);
    assert!(cursor
        .grid(WeekStart::SUNDAY)
        .iter()
        .any(|day| day.in_month && !reloaded.by_day(&day.iso).is_empty()));
}

#[tokio::test]
async fn test_stale_lookup_does_not_override_newer_date() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [{"dt": 0, "weather": [{"description": "snow", "icon": "13d"}]}]
        })))
        .mount(&mock_server)
        .await;

    let client = WeatherClient::new(Some("key".into()))
        .unwrap()
        .with_base_url(&mock_server.uri());

    let mut editor = ReminderEditor::create("2024-03-10");
    editor.set_location(Some(lisbon()));
    let stale = editor.pending_request().unwrap();

    editor.set_date("2024-03-11");
    let result = client
        .get_forecast_by_coords(stale.lat, stale.lon, &stale.date_iso)
        .await;
    assert!(!editor.apply_forecast(stale.generation, result));
    assert!(editor.is_loading());

    assert!(editor.load_forecast(&client).await);
    assert_eq!(editor.draft().weather.as_ref().unwrap().summary, "snow");
}

#[test]
fn test_clear_day_and_all_persist() {
    let backing: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::in_memory().unwrap());
    let writer = DeferredWriter::new(backing.clone());
    let mut store = ReminderStore::new();
    store.persist_to(writer.clone());

    for (date, text) in [("2024-03-10", "a"), ("2024-03-10", "b"), ("2024-03-11", "c")] {
        let mut editor = ReminderEditor::create(date);
        editor.set_text(text);
        editor.submit(&mut store).unwrap();
    }
    assert_eq!(store.remove_by_date("2024-03-10"), 2);
    writer.flush().unwrap();
    assert_eq!(ReminderStore::load(backing.as_ref()).len(), 1);

    store.remove_all();
    writer.flush().unwrap();
    assert!(ReminderStore::load(backing.as_ref()).is_empty());
}
