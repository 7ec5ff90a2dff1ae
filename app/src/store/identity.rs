use super::IdentityStore;
use crate::error::StoreError;
use crate::models::{self, sensor as sensor_model};

use async_trait::async_trait;
use senser_core::SensorIdentity;
use sqlx::PgPool;
use std::time::Duration;

pub struct PgIdentityStore {
    db_conn: PgPool,
}

impl PgIdentityStore {
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let db_conn = models::establish_db_connection(database_url, timeout).await?;
        sensor_model::create_table(&db_conn).await?;
        Ok(PgIdentityStore { db_conn })
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn create(&self, name: &str) -> Result<SensorIdentity, StoreError> {
        match sensor_model::insert(&self.db_conn, name).await {
            Ok(dao) => Ok(dao.into()),
            Err(err) if err.is_unique_violation() => Err(StoreError::Duplicate(name.to_owned())),
            Err(err) => Err(err),
        }
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<SensorIdentity>, StoreError> {
        Ok(sensor_model::get(&self.db_conn, id).await?.map(Into::into))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<SensorIdentity>, StoreError> {
        Ok(sensor_model::get_by_name(&self.db_conn, name)
            .await?
            .map(Into::into))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<SensorIdentity>, StoreError> {
        let daos = sensor_model::read(&self.db_conn, skip, limit).await?;
        Ok(daos.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        sensor_model::delete(&self.db_conn, id).await
    }
}
