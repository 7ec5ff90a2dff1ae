mod bucket;
pub mod error;
mod report;
pub mod search;
mod sensor;
mod telemetry;

pub use bucket::*;
pub use report::*;
pub use sensor::*;
pub use telemetry::*;

pub static CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Battery level below which a sensor is reported as running low
pub const DEFAULT_LOW_BATTERY_THRESHOLD: f64 = 0.2;
