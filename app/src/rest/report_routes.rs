use super::build_response;
use super::dto::SensorsDto;
use super::query::BatteryQuery;
use crate::config::CONFIG;
use crate::sensor::{AggregationReporter, ConcurrentObserver};
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let reporter = AggregationReporter::new(observer.clone());
    temperature_values(reporter.clone())
        .or(quantity_by_type(reporter.clone()))
        .or(low_battery(reporter))
}

/// GET /sensors/temperature/values
///
/// Min, max and average temperature per sensor
fn temperature_values(
    reporter: AggregationReporter,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || reporter.clone())
        .and(warp::path!("sensors" / "temperature" / "values"))
        .and(warp::get())
        .and_then(|reporter: AggregationReporter| async move {
            let resp = reporter.temperature_stats().await;
            build_response(resp.map(|sensors| SensorsDto { sensors }))
        })
        .boxed()
}

/// GET /sensors/quantity_by_type
fn quantity_by_type(
    reporter: AggregationReporter,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || reporter.clone())
        .and(warp::path!("sensors" / "quantity_by_type"))
        .and(warp::get())
        .and_then(|reporter: AggregationReporter| async move {
            let resp = reporter.count_by_type().await;
            build_response(resp.map(|sensors| SensorsDto { sensors }))
        })
        .boxed()
}

/// GET /sensors/low_battery?threshold=0.2
///
/// Sensors whose latest battery level is below the threshold,
/// LOW_BATTERY_THRESHOLD if omitted
fn low_battery(
    reporter: AggregationReporter,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || reporter.clone())
        .and(warp::path!("sensors" / "low_battery"))
        .and(warp::get())
        .and(warp::query::<BatteryQuery>())
        .and_then(|reporter: AggregationReporter, query: BatteryQuery| async move {
            let threshold = query
                .threshold
                .unwrap_or_else(|| CONFIG.low_battery_threshold());
            let resp = reporter.low_battery(threshold).await;
            build_response(resp.map(|sensors| SensorsDto { sensors }))
        })
        .boxed()
}
