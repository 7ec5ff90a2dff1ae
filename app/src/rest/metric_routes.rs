use crate::sensor::ConcurrentObserver;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    health(observer.clone())
}

/// GET /health
///
/// 503 while the identity store is unreachable
fn health(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::path!("health"))
        .and(warp::get())
        .then(|observer: Arc<ConcurrentObserver>| async move {
            let identity_reachable = observer.check_identity_store().await;
            let ret = dto::HealthyDto {
                healthy: identity_reachable,
                version: senser_core::CORE_VERSION.to_owned(),
                identity_store: if identity_reachable { "ok" } else { "unavailable" }.to_owned(),
            };
            let status = if ret.healthy {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            warp::reply::with_status(warp::reply::json(&ret), status)
        })
        .boxed()
}

mod dto {
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct HealthyDto {
        pub healthy: bool,
        pub version: String,
        pub identity_store: String,
    }
}
