use super::build_response;
use super::query::ListQuery;
use crate::sensor::{ConcurrentObserver, SensorObserver};
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let sensors = SensorObserver::new(observer.clone());
    register_sensor(sensors.clone())
        .or(list_sensors(sensors.clone()))
        .or(sensor_status(sensors.clone()))
        .or(unregister_sensor(sensors))
}

/// POST /sensors
///
/// Register a new sensor
///
/// Returns the assembled `Sensor`, 400 if the name is already taken
fn register_sensor(
    sensors: SensorObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || sensors.clone())
        .and(warp::path!("sensors"))
        .and(warp::post())
        .and(warp::body::json())
        .and_then(
            |sensors: SensorObserver, body: dto::SensorRegisterRequestDto| async move {
                let resp = sensors.register(body.into()).await;
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /sensors?skip=0&limit=100
///
/// Lists the identities of registered sensors, ordered by id
fn list_sensors(
    sensors: SensorObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || sensors.clone())
        .and(warp::path!("sensors"))
        .and(warp::get())
        .and(warp::query::<ListQuery>())
        .and_then(|sensors: SensorObserver, query: ListQuery| async move {
            let resp = sensors.list(query.skip, query.limit).await;
            build_response(resp)
        })
        .boxed()
}

/// GET /sensors/:id
///
/// Fetch a sensor, merged from identity and metadata
fn sensor_status(
    sensors: SensorObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || sensors.clone())
        .and(warp::path!("sensors" / i32))
        .and(warp::get())
        .and_then(|sensors: SensorObserver, sensor_id: i32| async move {
            let resp = sensors.get(sensor_id).await;
            build_response(resp)
        })
        .boxed()
}

/// DELETE /sensors/:id
///
/// Unregister a sensor, only its identity is removed
///
/// Returns the removed identity
fn unregister_sensor(
    sensors: SensorObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || sensors.clone())
        .and(warp::path!("sensors" / i32))
        .and(warp::delete())
        .and_then(|sensors: SensorObserver, sensor_id: i32| async move {
            let resp = sensors.unregister(sensor_id).await;
            build_response(resp)
        })
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use senser_core::SensorRegistration;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SensorRegisterRequestDto {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        #[serde(rename = "type")]
        pub sensor_type: String,
        pub mac_address: String,
        pub manufacturer: String,
        pub model: String,
        #[serde(alias = "serie_number")]
        pub serial_number: String,
        pub firmware_version: String,
        pub description: String,
    }

    impl From<SensorRegisterRequestDto> for SensorRegistration {
        fn from(dto: SensorRegisterRequestDto) -> Self {
            SensorRegistration {
                name: dto.name,
                latitude: dto.latitude,
                longitude: dto.longitude,
                sensor_type: dto.sensor_type,
                mac_address: dto.mac_address,
                manufacturer: dto.manufacturer,
                model: dto.model,
                serial_number: dto.serial_number,
                firmware_version: dto.firmware_version,
                description: dto.description,
            }
        }
    }
}
