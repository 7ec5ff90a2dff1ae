use crate::error::AssembleError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Rendering of `joined_at` in assembled sensors, wall clock as stored
pub const JOINED_AT_FORMAT: &str = "%m/%d/%Y, %H:%M:%S";

/// Row owned by the identity store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorIdentity {
    pub id: i32,
    pub name: String,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Document owned by the metadata store, the only source of location and device data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMetadata {
    pub id: i32,
    pub location: GeoPoint,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub description: String,
}

/// Input of a sensor registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRegistration {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub description: String,
}

impl SensorRegistration {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn metadata(&self, id: i32) -> SensorMetadata {
        SensorMetadata {
            id,
            location: self.location(),
            sensor_type: self.sensor_type.clone(),
            mac_address: self.mac_address.clone(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            serial_number: self.serial_number.clone(),
            firmware_version: self.firmware_version.clone(),
            description: self.description.clone(),
        }
    }
}

/// Assembled view over identity and metadata, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub mac_address: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub description: String,
    pub joined_at: String,
}

impl Sensor {
    pub fn assemble(
        identity: SensorIdentity,
        metadata: SensorMetadata,
    ) -> Result<Sensor, AssembleError> {
        if identity.id != metadata.id {
            return Err(AssembleError::IdMismatch(identity.id, metadata.id));
        }

        Ok(Sensor {
            id: identity.id,
            name: identity.name,
            latitude: metadata.location.latitude,
            longitude: metadata.location.longitude,
            sensor_type: metadata.sensor_type,
            mac_address: metadata.mac_address,
            manufacturer: metadata.manufacturer,
            model: metadata.model,
            serial_number: metadata.serial_number,
            firmware_version: metadata.firmware_version,
            description: metadata.description,
            joined_at: identity.joined_at.format(JOINED_AT_FORMAT).to_string(),
        })
    }
}
