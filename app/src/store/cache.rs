use super::TelemetryCache;
use crate::error::StoreError;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Key is the bare sensor id, values never expire
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        Ok(RedisCache { manager })
    }
}

#[async_trait]
impl TelemetryCache for RedisCache {
    async fn put(&self, id: i32, payload: String) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(id, payload).await?;
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        Ok(conn.get::<_, Option<String>>(id).await?)
    }
}
