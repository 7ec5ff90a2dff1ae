mod config;
mod error;
mod logging;
mod models;
mod rest;
mod sensor;
mod store;

use config::{StoreBackend, CONFIG};
use tracing::{error, info};

#[tokio::main]
pub async fn main() {
    logging::init_tracing(CONFIG.otel_stdout());

    let stores = match CONFIG.store_backend() {
        StoreBackend::Memory => {
            info!("Using in-memory stores");
            store::MemoryStores::new().stores()
        }
        StoreBackend::Remote => match store::Stores::connect().await {
            Ok(stores) => stores,
            Err(e) => {
                error!(error = %e, "Failed connecting to stores");
                logging::shutdown_tracing();
                std::process::exit(1);
            }
        },
    };

    let observer = sensor::ConcurrentObserver::new(stores, CONFIG.store_timeout());
    rest::dispatch_server(observer).await;

    logging::shutdown_tracing();
}
