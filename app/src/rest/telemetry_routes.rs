use super::build_response;
use super::query::{NearQuery, RangeQuery, SearchQuery};
use crate::sensor::{ConcurrentObserver, TelemetryReader, TelemetryWriter};
use senser_core::TelemetrySample;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let writer = TelemetryWriter::new(observer.clone());
    let reader = TelemetryReader::new(observer.clone());
    record_data(writer)
        .or(sensor_data(reader.clone()))
        .or(sensors_near(reader.clone()))
        .or(search_sensors(reader))
}

/// POST /sensors/:id/data
///
/// Record a telemetry sample
///
/// Returns the sensor merged with the stored sample, 404 if any store failed
fn record_data(
    writer: TelemetryWriter,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || writer.clone())
        .and(warp::path!("sensors" / i32 / "data"))
        .and(warp::post())
        .and(warp::body::json())
        .and_then(
            |writer: TelemetryWriter, sensor_id: i32, sample: TelemetrySample| async move {
                let resp = writer.record(sensor_id, sample).await;
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /sensors/:id/data?from=&to=&bucket=
///
/// Fetch bucketed history, by default the last day in hourly buckets
fn sensor_data(
    reader: TelemetryReader,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || reader.clone())
        .and(warp::path!("sensors" / i32 / "data"))
        .and(warp::get())
        .and(warp::query::<RangeQuery>())
        .and_then(
            |reader: TelemetryReader, sensor_id: i32, query: RangeQuery| async move {
                let resp = reader
                    .query_range(sensor_id, query.from, query.to, query.bucket.as_deref())
                    .await;
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /sensors/near?latitude=&longitude=&radius=
///
/// Sensors within `radius` meters, nearest first, with their latest sample
fn sensors_near(
    reader: TelemetryReader,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || reader.clone())
        .and(warp::path!("sensors" / "near"))
        .and(warp::get())
        .and(warp::query::<NearQuery>())
        .and_then(|reader: TelemetryReader, query: NearQuery| async move {
            let resp = reader
                .near(query.latitude, query.longitude, query.radius)
                .await;
            build_response(resp)
        })
        .boxed()
}

/// GET /sensors/search?query={"name":"sn-1"}&size=10&search_type=match
///
/// Full text lookup, `search_type` is one of match, match_phrase,
/// match_phrase_prefix, term, prefix or similar
fn search_sensors(
    reader: TelemetryReader,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || reader.clone())
        .and(warp::path!("sensors" / "search"))
        .and(warp::get())
        .and(warp::query::<SearchQuery>())
        .and_then(|reader: TelemetryReader, query: SearchQuery| async move {
            let resp = reader
                .search(&query.query, query.size, &query.search_type)
                .await;
            build_response(resp)
        })
        .boxed()
}
