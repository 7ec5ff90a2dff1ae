use chrono::{DateTime, Utc};
use senser_core::{Bucket, BucketWidth, TimeSeriesRow};

use crate::error::StoreError;

#[derive(sqlx::FromRow, Debug)]
pub struct BucketDao {
    pub(crate) bucket: DateTime<Utc>,
    pub(crate) samples: i64,
    pub(crate) avg_temperature: Option<f64>,
    pub(crate) min_temperature: Option<f64>,
    pub(crate) max_temperature: Option<f64>,
    pub(crate) avg_humidity: Option<f64>,
    pub(crate) avg_velocity: Option<f64>,
    pub(crate) avg_battery_level: Option<f64>,
}

impl From<BucketDao> for Bucket {
    fn from(val: BucketDao) -> Self {
        Bucket {
            bucket: val.bucket,
            samples: val.samples,
            avg_temperature: val.avg_temperature,
            min_temperature: val.min_temperature,
            max_temperature: val.max_temperature,
            avg_humidity: val.avg_humidity,
            avg_velocity: val.avg_velocity,
            avg_battery_level: val.avg_battery_level,
        }
    }
}

pub async fn create_table(conn: &sqlx::PgPool) -> Result<(), StoreError> {
    sql_stmnt!(
        r#"CREATE TABLE IF NOT EXISTS sensor_data (
            id INTEGER NOT NULL,
            velocity DOUBLE PRECISION,
            temperature DOUBLE PRECISION,
            humidity DOUBLE PRECISION,
            last_seen TIMESTAMPTZ NOT NULL,
            battery_level DOUBLE PRECISION NOT NULL)"#
    )
    .execute(conn)
    .await?;
    sql_stmnt!("SELECT create_hypertable('sensor_data', 'last_seen', if_not_exists => TRUE)")
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert(
    conn: &sqlx::PgPool,
    sensor_id: i32,
    row: &TimeSeriesRow,
) -> Result<(), StoreError> {
    sql_stmnt!(
        r#"INSERT INTO sensor_data
            (id, velocity, temperature, humidity, last_seen, battery_level)
            VALUES ($1, $2, $3, $4, $5, $6)"#,
        sensor_id,
        row.velocity,
        row.temperature,
        row.humidity,
        row.last_seen,
        row.battery_level
    )
    .execute(conn)
    .await?;
    Ok(())
}

/// Buckets are ascending, empty buckets are not emitted
pub async fn get_buckets(
    conn: &sqlx::PgPool,
    sensor_id: i32,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    width: BucketWidth,
) -> Result<Vec<BucketDao>, StoreError> {
    Ok(sql_stmnt!(
        BucketDao,
        r#"SELECT time_bucket($1::text::interval, last_seen) AS bucket,
                count(*) AS samples,
                avg(temperature) AS avg_temperature,
                min(temperature) AS min_temperature,
                max(temperature) AS max_temperature,
                avg(humidity) AS avg_humidity,
                avg(velocity) AS avg_velocity,
                avg(battery_level) AS avg_battery_level
            FROM sensor_data
            WHERE id = $2 AND last_seen >= $3 AND last_seen <= $4
            GROUP BY bucket
            ORDER BY bucket"#,
        width.interval(),
        sensor_id,
        from,
        until
    )
    .fetch_all(conn)
    .await?)
}
