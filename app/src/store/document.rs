use super::DocumentStore;
use crate::error::StoreError;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReplaceOptions;
use mongodb::{Client, Collection, IndexModel};
use senser_core::{GeoPoint, SensorMetadata};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::info;

const DATABASE: &str = "sensors";
const COLLECTION: &str = "sensorsData";

/// GeoJSON point, coordinates are `[longitude, latitude]`
#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        GeoJsonPoint {
            kind: "Point".to_owned(),
            coordinates: [point.longitude, point.latitude],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataDocument {
    id: i32,
    location: GeoJsonPoint,
    #[serde(rename = "type")]
    sensor_type: String,
    mac_address: String,
    manufacturer: String,
    model: String,
    serial_number: String,
    firmware_version: String,
    description: String,
}

impl From<&SensorMetadata> for MetadataDocument {
    fn from(metadata: &SensorMetadata) -> Self {
        MetadataDocument {
            id: metadata.id,
            location: metadata.location.into(),
            sensor_type: metadata.sensor_type.clone(),
            mac_address: metadata.mac_address.clone(),
            manufacturer: metadata.manufacturer.clone(),
            model: metadata.model.clone(),
            serial_number: metadata.serial_number.clone(),
            firmware_version: metadata.firmware_version.clone(),
            description: metadata.description.clone(),
        }
    }
}

impl From<MetadataDocument> for SensorMetadata {
    fn from(document: MetadataDocument) -> Self {
        let [longitude, latitude] = document.location.coordinates;
        SensorMetadata {
            id: document.id,
            location: GeoPoint::new(latitude, longitude),
            sensor_type: document.sensor_type,
            mac_address: document.mac_address,
            manufacturer: document.manufacturer,
            model: document.model,
            serial_number: document.serial_number,
            firmware_version: document.firmware_version,
            description: document.description,
        }
    }
}

pub struct MongoDocumentStore {
    collection: Collection<MetadataDocument>,
    geo_index: OnceCell<()>,
}

impl MongoDocumentStore {
    pub async fn connect(mongodb_url: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(mongodb_url).await?;
        let collection = client.database(DATABASE).collection(COLLECTION);
        Ok(MongoDocumentStore {
            collection,
            geo_index: OnceCell::new(),
        })
    }

    async fn ensure_geo_index(&self) -> Result<(), StoreError> {
        self.geo_index
            .get_or_try_init(|| async {
                let index = IndexModel::builder()
                    .keys(doc! { "location": "2dsphere" })
                    .build();
                self.collection.create_index(index, None).await?;
                info!(store = super::DOCUMENTS, "Ensured 2dsphere index on location");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn upsert(&self, metadata: &SensorMetadata) -> Result<(), StoreError> {
        let document = MetadataDocument::from(metadata);
        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(doc! { "id": metadata.id }, &document, options)
            .await?;
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<SensorMetadata>, StoreError> {
        let document = self.collection.find_one(doc! { "id": id }, None).await?;
        Ok(document.map(Into::into))
    }

    async fn geo_near(
        &self,
        point: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<SensorMetadata>, StoreError> {
        self.ensure_geo_index().await?;

        let filter = doc! {
            "location": {
                "$near": {
                    "$geometry": {
                        "type": "Point",
                        "coordinates": [point.longitude, point.latitude],
                    },
                    "$maxDistance": radius_m,
                }
            }
        };
        let cursor = self.collection.find(filter, None).await?;
        let documents: Vec<MetadataDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_location_is_stored_longitude_first() {
        let metadata = SensorMetadata {
            id: 1,
            location: GeoPoint::new(41.0, 2.0),
            sensor_type: "temp_sensor".to_owned(),
            mac_address: "00:00:00:00:00:01".to_owned(),
            manufacturer: "Dummy".to_owned(),
            model: "T-1".to_owned(),
            serial_number: "0001".to_owned(),
            firmware_version: "1.0".to_owned(),
            description: "roof".to_owned(),
        };

        let document = MetadataDocument::from(&metadata);
        assert_eq!([2.0, 41.0], document.location.coordinates);
        assert_eq!("Point", document.location.kind);

        let back = SensorMetadata::from(document);
        assert_eq!(metadata, back);
    }
}
