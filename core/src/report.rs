use crate::sensor::Sensor;
use serde::{Deserialize, Serialize};

/// Per sensor temperature extremes computed by the wide-column store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAggregate {
    pub id: i32,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub quantity: i64,
}

/// Most recent battery level of a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub id: i32,
    pub battery_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReport {
    #[serde(flatten)]
    pub sensor: Sensor,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub average_temperature: f64,
}

impl TemperatureReport {
    pub fn new(sensor: Sensor, aggregate: &TemperatureAggregate) -> Self {
        TemperatureReport {
            sensor,
            min_temperature: aggregate.min,
            max_temperature: aggregate.max,
            average_temperature: aggregate.avg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowBatteryReport {
    #[serde(flatten)]
    pub sensor: Sensor,
    pub battery_level: f64,
}
