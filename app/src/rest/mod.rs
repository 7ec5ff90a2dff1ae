use crate::config::CONFIG;
use crate::error::GatewayError;
use crate::sensor::ConcurrentObserver;

use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

mod metric_routes;
mod query;
mod report_routes;
mod sensor_routes;
mod telemetry_routes;

#[cfg(test)]
mod test;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    sensor_routes::routes(observer)
        .or(telemetry_routes::routes(observer))
        .or(report_routes::routes(observer))
        .or(metric_routes::routes(observer))
        .recover(handle_rejection)
}

/// Serves the REST endpoints until Ctrl-C is received
pub async fn dispatch_server(observer: Arc<ConcurrentObserver>) {
    let port = CONFIG.server_port();
    let routes = routes(&observer).with(warp::trace::request());

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed listening for shutdown signal: {}", e);
            }
            info!("Shutting down REST endpoints");
        });
    info!(addr = %addr, "Start listening to REST endpoints");
    server.await;
}

fn build_response<T: serde::Serialize>(
    resp: Result<T, GatewayError>,
) -> Result<warp::reply::Response, Rejection> {
    match resp {
        Ok(data) => Ok(warp::reply::json(&data).into_response()),
        Err(err) => {
            let status = match &err {
                GatewayError::NotFound(_) | GatewayError::InconsistentState(_) => {
                    StatusCode::NOT_FOUND
                }
                GatewayError::Conflict(_) | GatewayError::InvalidArgument(_) => {
                    StatusCode::BAD_REQUEST
                }
                GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            };
            if status == StatusCode::SERVICE_UNAVAILABLE {
                error!(error = %err, "Request failed");
            } else {
                debug!(error = %err, "Request rejected");
            }
            Ok(error_response(err.public_message(), status))
        }
    }
}

fn error_response(message: String, status: StatusCode) -> warp::reply::Response {
    let body = dto::ErrorResponseDto { error: message };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (message, status) = if err.is_not_found() {
        ("Not found", StatusCode::NOT_FOUND)
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        ("Invalid request body", StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        ("Invalid query parameters", StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else {
        error!("Unhandled rejection: {:?}", err);
        ("Internal error", StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(error_response(message.to_owned(), status))
}

pub mod dto {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponseDto {
        pub error: String,
    }

    /// Reports are wrapped as `{"sensors": [...]}`
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SensorsDto<T> {
        pub sensors: Vec<T>,
    }
}
