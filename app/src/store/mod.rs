use crate::config::CONFIG;
use crate::error::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use senser_core::search::{SearchDocument, SearchRequest};
use senser_core::{
    BatteryReading, Bucket, BucketWidth, GeoPoint, SensorIdentity, SensorMetadata,
    TemperatureAggregate, TimeSeriesRow, TypeCount,
};
use std::sync::Arc;
use tracing::info;

mod cache;
mod document;
mod identity;
pub mod memory;
mod rollup;
mod search;
mod timeseries;

pub use cache::RedisCache;
pub use document::MongoDocumentStore;
pub use identity::PgIdentityStore;
pub use memory::MemoryStores;
pub use rollup::ScyllaRollupStore;
pub use search::ElasticSearchIndex;
pub use timeseries::TimescaleStore;

pub const IDENTITY: &str = "identity";
pub const DOCUMENTS: &str = "documents";
pub const CACHE: &str = "cache";
pub const TIMESERIES: &str = "timeseries";
pub const ROLLUPS: &str = "rollups";
pub const SEARCH: &str = "search";

/// Relational store, authoritative for sensor existence
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create(&self, name: &str) -> Result<SensorIdentity, StoreError>;
    async fn get_by_id(&self, id: i32) -> Result<Option<SensorIdentity>, StoreError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<SensorIdentity>, StoreError>;
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<SensorIdentity>, StoreError>;
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;
}

/// Sensor metadata keyed by id, with geospatial lookup
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upsert(&self, metadata: &SensorMetadata) -> Result<(), StoreError>;
    async fn get(&self, id: i32) -> Result<Option<SensorMetadata>, StoreError>;
    /// Hits ordered by distance, nearest first
    async fn geo_near(
        &self,
        point: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<SensorMetadata>, StoreError>;
}

/// Last known serialized sample per sensor, last write wins
#[async_trait]
pub trait TelemetryCache: Send + Sync {
    async fn put(&self, id: i32, payload: String) -> Result<(), StoreError>;
    async fn get(&self, id: i32) -> Result<Option<String>, StoreError>;
}

#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn insert_sample(&self, id: i32, row: &TimeSeriesRow) -> Result<(), StoreError>;
    async fn bucketed_query(
        &self,
        id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        width: BucketWidth,
    ) -> Result<Vec<Bucket>, StoreError>;
}

/// Wide-column rollup tables
#[async_trait]
pub trait RollupStore: Send + Sync {
    /// Idempotent, performs the DDL at most once per process
    async fn ensure_schema(&self) -> Result<(), StoreError>;
    async fn insert_temperature(
        &self,
        id: i32,
        last_seen: DateTime<Utc>,
        temperature: f64,
    ) -> Result<(), StoreError>;
    async fn insert_type(&self, id: i32, sensor_type: &str) -> Result<(), StoreError>;
    async fn insert_battery(&self, id: i32, battery_level: f64) -> Result<(), StoreError>;
    async fn aggregate_temperature(&self) -> Result<Vec<TemperatureAggregate>, StoreError>;
    async fn count_by_type(&self) -> Result<Vec<TypeCount>, StoreError>;
    async fn low_battery(&self, threshold: f64) -> Result<Vec<BatteryReading>, StoreError>;
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Idempotent, creates the index with its mapping if absent
    async fn ensure_index(&self) -> Result<(), StoreError>;
    async fn index_document(&self, doc: &SearchDocument) -> Result<(), StoreError>;
    /// Ids of the ranked hits
    async fn search(&self, request: &SearchRequest) -> Result<Vec<i32>, StoreError>;
}

/// Long-lived store handles, shared by all requests
#[derive(Clone)]
pub struct Stores {
    pub identity: Arc<dyn IdentityStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn TelemetryCache>,
    pub timeseries: Arc<dyn TimeSeriesStore>,
    pub rollups: Arc<dyn RollupStore>,
    pub search: Arc<dyn SearchIndex>,
}

impl Stores {
    /// Connects every remote backend named in the configuration
    #[tracing::instrument]
    pub async fn connect() -> Result<Self, StoreError> {
        let timeout = CONFIG.store_timeout();

        let identity = PgIdentityStore::connect(&CONFIG.database_url(), timeout).await?;
        info!(store = IDENTITY, "Connected");
        let timeseries = TimescaleStore::connect(&CONFIG.timescale_url(), timeout).await?;
        info!(store = TIMESERIES, "Connected");
        let documents = MongoDocumentStore::connect(&CONFIG.mongodb_url()).await?;
        info!(store = DOCUMENTS, "Connected");
        let cache = RedisCache::connect(&CONFIG.redis_url()).await?;
        info!(store = CACHE, "Connected");
        let rollups = ScyllaRollupStore::connect(&CONFIG.cassandra_hosts()).await?;
        info!(store = ROLLUPS, "Connected");
        let search = ElasticSearchIndex::new(&CONFIG.elasticsearch_url(), timeout)?;

        Ok(Stores {
            identity: Arc::new(identity),
            documents: Arc::new(documents),
            cache: Arc::new(cache),
            timeseries: Arc::new(timeseries),
            rollups: Arc::new(rollups),
            search: Arc::new(search),
        })
    }
}
