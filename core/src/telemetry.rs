use crate::sensor::Sensor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single telemetry reading reported by a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub velocity: Option<f64>,
    pub battery_level: f64,
    pub last_seen: DateTime<Utc>,
}

/// Shape of a sample as appended to the time-series store
///
/// Temperature and humidity only travel as a pair, a sample carrying just one
/// of them is written without both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesRow {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub velocity: Option<f64>,
    pub battery_level: f64,
    pub last_seen: DateTime<Utc>,
}

impl From<&TelemetrySample> for TimeSeriesRow {
    fn from(sample: &TelemetrySample) -> Self {
        let (temperature, humidity) = match (sample.temperature, sample.humidity) {
            (Some(t), Some(h)) => (Some(t), Some(h)),
            _ => (None, None),
        };
        TimeSeriesRow {
            temperature,
            humidity,
            velocity: sample.velocity,
            battery_level: sample.battery_level,
            last_seen: sample.last_seen,
        }
    }
}

/// Combined view of an assembled sensor and its latest telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorTelemetry {
    #[serde(flatten)]
    pub sensor: Sensor,
    #[serde(flatten)]
    pub telemetry: Option<TelemetrySample>,
}

/// Aggregation over one time bucket of the time-series store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket: DateTime<Utc>,
    pub samples: i64,
    pub avg_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub avg_velocity: Option<f64>,
    pub avg_battery_level: Option<f64>,
}
