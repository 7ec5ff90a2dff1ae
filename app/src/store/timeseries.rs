use super::TimeSeriesStore;
use crate::error::StoreError;
use crate::models::{self, sensor_data as sensor_data_model};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use senser_core::{Bucket, BucketWidth, TimeSeriesRow};
use sqlx::PgPool;
use std::time::Duration;

pub struct TimescaleStore {
    db_conn: PgPool,
}

impl TimescaleStore {
    pub async fn connect(timescale_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let db_conn = models::establish_db_connection(timescale_url, timeout).await?;
        sensor_data_model::create_table(&db_conn).await?;
        Ok(TimescaleStore { db_conn })
    }
}

#[async_trait]
impl TimeSeriesStore for TimescaleStore {
    async fn insert_sample(&self, id: i32, row: &TimeSeriesRow) -> Result<(), StoreError> {
        sensor_data_model::insert(&self.db_conn, id, row).await
    }

    async fn bucketed_query(
        &self,
        id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        width: BucketWidth,
    ) -> Result<Vec<Bucket>, StoreError> {
        let daos = sensor_data_model::get_buckets(&self.db_conn, id, from, to, width).await?;
        Ok(daos.into_iter().map(Into::into).collect())
    }
}
