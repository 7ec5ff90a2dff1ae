use super::sensor_routes::dto::SensorRegisterRequestDto;
use super::*;
use crate::store::{MemoryStores, IDENTITY};
use senser_core::{Bucket, Sensor, SensorTelemetry};
use serde_json::{json, Value};
use std::time::Duration;

fn build_mocked_observer() -> (Arc<MemoryStores>, Arc<ConcurrentObserver>) {
    let memory = MemoryStores::new();
    let observer = ConcurrentObserver::new(memory.stores(), Duration::from_secs(1));
    (memory, observer)
}

fn register_dto(name: &str) -> SensorRegisterRequestDto {
    SensorRegisterRequestDto {
        name: name.to_owned(),
        latitude: 41.0,
        longitude: 2.0,
        sensor_type: "temp_sensor".to_owned(),
        mac_address: "00:00:00:00:00:01".to_owned(),
        manufacturer: "Dummy".to_owned(),
        model: "T-1".to_owned(),
        serial_number: "0001".to_owned(),
        firmware_version: "1.0".to_owned(),
        description: "Rooftop temperature gauge".to_owned(),
    }
}

async fn register<F>(routes: &F, name: &str) -> Sensor
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let res = warp::test::request()
        .method("POST")
        .path("/sensors")
        .json(&register_dto(name))
        .reply(routes)
        .await;
    assert_eq!(200, res.status());
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn test_rest_register_sensor() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);

    // Execute
    let sensor = register(&routes, "sn-1").await;
    let duplicate = warp::test::request()
        .method("POST")
        .path("/sensors")
        .json(&register_dto("sn-1"))
        .reply(&routes)
        .await;

    // Validate
    assert_eq!("sn-1", sensor.name);
    assert_eq!(41.0, sensor.latitude);
    assert_eq!(400, duplicate.status());
    let err: dto::ErrorResponseDto = serde_json::from_slice(duplicate.body()).unwrap();
    assert_eq!("Sensor with same name already registered", err.error);
}

#[tokio::test]
async fn test_rest_register_legacy_field_name() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);
    let body = json!({
        "name": "sn-1",
        "latitude": 41.0,
        "longitude": 2.0,
        "type": "temp_sensor",
        "mac_address": "00:00:00:00:00:01",
        "manufacturer": "Dummy",
        "model": "T-1",
        "serie_number": "0001",
        "firmware_version": "1.0",
        "description": "Rooftop temperature gauge"
    });

    // Execute
    let res = warp::test::request()
        .method("POST")
        .path("/sensors")
        .json(&body)
        .reply(&routes)
        .await;

    // Validate
    assert_eq!(200, res.status());
    let sensor: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!("0001", sensor["serial_number"]);
    assert_eq!("temp_sensor", sensor["type"]);
}

#[tokio::test]
async fn test_rest_invalid_body() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);

    // Execute
    let res = warp::test::request()
        .method("POST")
        .path("/sensors")
        .json(&json!({"name": "sn-1"}))
        .reply(&routes)
        .await;

    // Validate
    assert_eq!(400, res.status());
}

#[tokio::test]
async fn test_rest_sensor_status() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);
    let sensor = register(&routes, "sn-1").await;

    // Execute
    let found = warp::test::request()
        .path(&format!("/sensors/{}", sensor.id))
        .reply(&routes)
        .await;
    let missing = warp::test::request()
        .path(&format!("/sensors/{}", sensor.id + 1))
        .reply(&routes)
        .await;

    // Validate
    assert_eq!(200, found.status());
    let fetched: Sensor = serde_json::from_slice(found.body()).unwrap();
    assert_eq!(sensor, fetched);
    assert_eq!(404, missing.status());
}

#[tokio::test]
async fn test_rest_list_and_delete() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);
    let first = register(&routes, "sn-1").await;
    register(&routes, "sn-2").await;

    // Execute
    let deleted = warp::test::request()
        .method("DELETE")
        .path(&format!("/sensors/{}", first.id))
        .reply(&routes)
        .await;
    let again = warp::test::request()
        .method("DELETE")
        .path(&format!("/sensors/{}", first.id))
        .reply(&routes)
        .await;
    let listed = warp::test::request()
        .path("/sensors?skip=0&limit=10")
        .reply(&routes)
        .await;

    // Validate
    assert_eq!(200, deleted.status());
    assert_eq!(404, again.status());
    let identities: Vec<Value> = serde_json::from_slice(listed.body()).unwrap();
    assert_eq!(1, identities.len());
    assert_eq!("sn-2", identities[0]["name"]);
}

#[tokio::test]
async fn test_rest_record_and_query_data() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);
    let sensor = register(&routes, "sn-1").await;
    let sample = json!({
        "temperature": 21.5,
        "humidity": 40.0,
        "battery_level": 0.95,
        "last_seen": "2024-05-01T10:00:00Z"
    });

    // Execute
    let recorded = warp::test::request()
        .method("POST")
        .path(&format!("/sensors/{}/data", sensor.id))
        .json(&sample)
        .reply(&routes)
        .await;
    let history = warp::test::request()
        .path(&format!(
            "/sensors/{}/data?from=2024-05-01T00:00:00Z&to=2024-05-02T00:00:00Z&bucket=day",
            sensor.id
        ))
        .reply(&routes)
        .await;
    let bad_bucket = warp::test::request()
        .path(&format!("/sensors/{}/data?bucket=fortnight", sensor.id))
        .reply(&routes)
        .await;

    // Validate
    assert_eq!(200, recorded.status());
    let view: SensorTelemetry = serde_json::from_slice(recorded.body()).unwrap();
    assert_eq!(sensor, view.sensor);
    assert_eq!(Some(21.5), view.telemetry.unwrap().temperature);

    assert_eq!(200, history.status());
    let buckets: Vec<Bucket> = serde_json::from_slice(history.body()).unwrap();
    assert_eq!(1, buckets.len());
    assert_eq!(Some(21.5), buckets[0].max_temperature);

    assert_eq!(400, bad_bucket.status());
}

#[tokio::test]
async fn test_rest_record_unknown_sensor() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);

    // Execute
    let res = warp::test::request()
        .method("POST")
        .path("/sensors/9/data")
        .json(&json!({"battery_level": 0.5, "last_seen": "2024-05-01T10:00:00Z"}))
        .reply(&routes)
        .await;

    // Validate
    assert_eq!(404, res.status());
    let err: dto::ErrorResponseDto = serde_json::from_slice(res.body()).unwrap();
    assert_eq!("Sensor not found", err.error);
}

#[tokio::test]
async fn test_rest_near_and_search() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);
    let sensor = register(&routes, "sn-1").await;

    // Execute
    let near = warp::test::request()
        .path("/sensors/near?latitude=41.0&longitude=2.0&radius=100")
        .reply(&routes)
        .await;
    let near_missing_args = warp::test::request()
        .path("/sensors/near?latitude=41.0")
        .reply(&routes)
        .await;
    let search = warp::test::request()
        .path("/sensors/search?query=%7B%22name%22%3A%22sn-1%22%7D")
        .reply(&routes)
        .await;
    let malicious = warp::test::request()
        .path("/sensors/search?query=__import__%28%27os%27%29&search_type=match")
        .reply(&routes)
        .await;

    // Validate
    assert_eq!(200, near.status());
    let views: Vec<Value> = serde_json::from_slice(near.body()).unwrap();
    assert_eq!(1, views.len());
    assert_eq!(sensor.id as i64, views[0]["id"]);

    assert_eq!(400, near_missing_args.status());

    assert_eq!(200, search.status());
    let found: Vec<Sensor> = serde_json::from_slice(search.body()).unwrap();
    assert_eq!(vec![sensor], found);

    assert_eq!(400, malicious.status());
}

#[tokio::test]
async fn test_rest_reports() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);
    let sensor = register(&routes, "sn-1").await;
    warp::test::request()
        .method("POST")
        .path(&format!("/sensors/{}/data", sensor.id))
        .json(&json!({
            "temperature": 21.5,
            "humidity": 40.0,
            "battery_level": 0.1,
            "last_seen": "2024-05-01T10:00:00Z"
        }))
        .reply(&routes)
        .await;

    // Execute
    let temperatures = warp::test::request()
        .path("/sensors/temperature/values")
        .reply(&routes)
        .await;
    let quantities = warp::test::request()
        .path("/sensors/quantity_by_type")
        .reply(&routes)
        .await;
    let low_battery = warp::test::request()
        .path("/sensors/low_battery?threshold=0.2")
        .reply(&routes)
        .await;

    // Validate
    let temperatures: Value = serde_json::from_slice(temperatures.body()).unwrap();
    assert_eq!(21.5, temperatures["sensors"][0]["average_temperature"]);
    assert_eq!("sn-1", temperatures["sensors"][0]["name"]);

    let quantities: Value = serde_json::from_slice(quantities.body()).unwrap();
    assert_eq!(
        json!({"sensors": [{"type": "temp_sensor", "quantity": 1}]}),
        quantities
    );

    let low_battery: Value = serde_json::from_slice(low_battery.body()).unwrap();
    assert_eq!(0.1, low_battery["sensors"][0]["battery_level"]);
}

#[tokio::test]
async fn test_rest_health() {
    // Prepare
    let (memory, observer) = build_mocked_observer();
    let routes = routes(&observer);

    // Execute
    let healthy = warp::test::request().path("/health").reply(&routes).await;
    memory.set_unreachable(IDENTITY, true);
    let unhealthy = warp::test::request().path("/health").reply(&routes).await;
    let unavailable = warp::test::request().path("/sensors/1").reply(&routes).await;

    // Validate
    assert_eq!(200, healthy.status());
    assert_eq!(503, unhealthy.status());
    assert_eq!(503, unavailable.status());
    let err: dto::ErrorResponseDto = serde_json::from_slice(unavailable.body()).unwrap();
    assert_eq!("Service unavailable", err.error);
}

#[tokio::test]
async fn test_rest_unknown_route() {
    // Prepare
    let (_, observer) = build_mocked_observer();
    let routes = routes(&observer);

    // Execute
    let res = warp::test::request().path("/unknown").reply(&routes).await;

    // Validate
    assert_eq!(404, res.status());
}
