use crate::error::StoreError;
use chrono::NaiveDateTime;
use senser_core::SensorIdentity;

#[derive(sqlx::FromRow, Debug)]
pub struct SensorDao {
    pub(crate) id: i32,
    pub(crate) name: String,
    pub(crate) joined_at: NaiveDateTime,
}

impl SensorDao {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &String {
        &self.name
    }
}

impl From<SensorDao> for SensorIdentity {
    fn from(val: SensorDao) -> Self {
        SensorIdentity {
            id: val.id,
            name: val.name,
            joined_at: val.joined_at,
        }
    }
}

pub async fn create_table(conn: &sqlx::PgPool) -> Result<(), StoreError> {
    sql_stmnt!(
        r#"CREATE TABLE IF NOT EXISTS sensors (
            id SERIAL PRIMARY KEY,
            name VARCHAR NOT NULL UNIQUE,
            joined_at TIMESTAMP NOT NULL DEFAULT now())"#
    )
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert(conn: &sqlx::PgPool, name: &str) -> Result<SensorDao, StoreError> {
    Ok(sql_stmnt!(
        SensorDao,
        "INSERT INTO sensors (name) VALUES ($1) RETURNING id, name, joined_at",
        name
    )
    .fetch_one(conn)
    .await?)
}

/// READ sensors
pub async fn read(
    conn: &sqlx::PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<SensorDao>, StoreError> {
    Ok(sql_stmnt!(
        SensorDao,
        "SELECT id, name, joined_at FROM sensors ORDER BY id OFFSET $1 LIMIT $2",
        skip,
        limit
    )
    .fetch_all(conn)
    .await?)
}

pub async fn get(conn: &sqlx::PgPool, sensor_id: i32) -> Result<Option<SensorDao>, StoreError> {
    Ok(sql_stmnt!(
        SensorDao,
        "SELECT id, name, joined_at FROM sensors WHERE id = $1",
        sensor_id
    )
    .fetch_optional(conn)
    .await?)
}

pub async fn get_by_name(
    conn: &sqlx::PgPool,
    name: &str,
) -> Result<Option<SensorDao>, StoreError> {
    Ok(sql_stmnt!(
        SensorDao,
        "SELECT id, name, joined_at FROM sensors WHERE name = $1",
        name
    )
    .fetch_optional(conn)
    .await?)
}

pub async fn delete(conn: &sqlx::PgPool, remove_id: i32) -> Result<bool, StoreError> {
    let result = sql_stmnt!("DELETE FROM sensors WHERE id = $1", remove_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
