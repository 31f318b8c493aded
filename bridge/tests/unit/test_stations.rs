//! Station and scenario sync

use http::Method;
use serde_json::json;

use yadevices::http::transport::RequestBody;
use yadevices::store::DataStore;
use yadevices::sync::stations::{ScenarioReport, MARKER_PHRASE};

use crate::common::Harness;

const STATION_IOT_ID: &str = "4f2a-9c";
const ENCODED_NAME: &str = "осис няакылд";

async fn linked_station(h: &Harness) {
    let mut station = h.store.get_or_create_station("q-123").await.unwrap();
    station.title = "Станция".to_string();
    station.iot_id = Some(STATION_IOT_ID.to_string());
    h.store.update_station(&station).await.unwrap();
}

#[tokio::test]
async fn test_refresh_stations_upserts_online_stats() {
    let h = Harness::new().await;
    h.transport.on(
        Method::GET,
        &h.endpoints.online_stats(),
        200,
        json!({"items": [{
            "id": "q-123",
            "name": "Станция",
            "icon": "http://icons/station.png",
            "platform": "yandexstation_2",
            "screen_capable": true,
            "screen_present": false,
            "online": true
        }]}),
    );
    h.transport.on(
        Method::GET,
        &h.endpoints.scenarios(),
        200,
        json!({"status": "ok", "scenarios": []}),
    );

    let report = h.state.stations.refresh_stations().await.unwrap();
    assert_eq!(report, ScenarioReport::default());

    let station = h.store.station_by_station_id("q-123").await.unwrap().unwrap();
    assert_eq!(station.title, "Станция");
    assert_eq!(station.platform.as_deref(), Some("yandexstation_2"));
    assert!(station.screen_capable);
    assert!(!station.screen_present);
    assert!(station.online);
}

#[tokio::test]
async fn test_missing_scenario_is_created() {
    let h = Harness::new().await;
    h.csrf_page("tok");
    linked_station(&h).await;

    h.transport.on(
        Method::GET,
        &h.endpoints.scenarios(),
        200,
        json!({"status": "ok", "scenarios": [{"id": "sc-other", "name": "Утро"}]}),
    );
    h.transport.on(
        Method::POST,
        &h.endpoints.scenario_create(),
        200,
        json!({"status": "ok", "scenario_id": "sc-new"}),
    );

    let report = h.state.stations.add_scenarios().await.unwrap();
    assert_eq!(report.created, 1);

    let station = h.store.station_by_station_id("q-123").await.unwrap().unwrap();
    assert_eq!(station.tts_scenario.as_deref(), Some("sc-new"));

    let sent = h
        .transport
        .requests_to(&Method::POST, &h.endpoints.scenario_create());
    assert_eq!(sent.len(), 1);
    let RequestBody::Json(body) = &sent[0].body else {
        panic!("expected a JSON body");
    };
    assert_eq!(body["name"], json!(ENCODED_NAME));
    assert_eq!(body["triggers"][0]["value"], json!("няакылд"));
    let launch = &body["steps"][0]["parameters"]["launch_devices"][0];
    assert_eq!(launch["id"], json!(STATION_IOT_ID));
    assert_eq!(launch["capabilities"][0]["state"]["value"], json!(MARKER_PHRASE));
}

#[tokio::test]
async fn test_existing_scenario_is_adopted() {
    let h = Harness::new().await;
    linked_station(&h).await;

    h.transport.on(
        Method::GET,
        &h.endpoints.scenarios(),
        200,
        json!({"status": "ok", "scenarios": [{"id": "sc-old", "name": ENCODED_NAME}]}),
    );

    let report = h.state.stations.add_scenarios().await.unwrap();
    assert_eq!(report.adopted, 1);
    assert_eq!(report.created, 0);

    let station = h.store.station_by_station_id("q-123").await.unwrap().unwrap();
    assert_eq!(station.tts_scenario.as_deref(), Some("sc-old"));
    assert!(h
        .transport
        .requests_to(&Method::POST, &h.endpoints.scenario_create())
        .is_empty());
}

#[tokio::test]
async fn test_rejected_creation_is_counted() {
    let h = Harness::new().await;
    h.csrf_page("tok");
    linked_station(&h).await;

    h.transport.on(
        Method::GET,
        &h.endpoints.scenarios(),
        200,
        json!({"status": "ok", "scenarios": []}),
    );
    h.transport.on(
        Method::POST,
        &h.endpoints.scenario_create(),
        400,
        json!({"status": "error", "code": "BAD_REQUEST"}),
    );

    let report = h.state.stations.add_scenarios().await.unwrap();
    assert_eq!(report.failed, 1);
    let station = h.store.station_by_station_id("q-123").await.unwrap().unwrap();
    assert_eq!(station.tts_scenario, None);
}

#[tokio::test]
async fn test_unavailable_scenario_list_creates_nothing() {
    let h = Harness::new().await;
    linked_station(&h).await;

    tokio_test::assert_err!(h.state.stations.add_scenarios().await);
    assert!(h
        .transport
        .requests_to(&Method::POST, &h.endpoints.scenario_create())
        .is_empty());
}
