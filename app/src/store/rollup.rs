use super::RollupStore;
use crate::error::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::cql_to_rust::FromRow;
use scylla::frame::value::CqlTimestamp;
use scylla::{QueryResult, Session, SessionBuilder};
use senser_core::{BatteryReading, TemperatureAggregate, TypeCount};
use tokio::sync::OnceCell;
use tracing::info;

const SCHEMA: [&str; 4] = [
    r#"CREATE KEYSPACE IF NOT EXISTS sensor WITH REPLICATION = {
        'class': 'SimpleStrategy',
        'replication_factor': 1 }"#,
    r#"CREATE TABLE IF NOT EXISTS sensor.sensor_temperature (
        id INT,
        last_seen TIMESTAMP,
        temperature DOUBLE,
        PRIMARY KEY (id, last_seen))"#,
    r#"CREATE TABLE IF NOT EXISTS sensor.sensor_type (
        id INT,
        type TEXT,
        PRIMARY KEY (type, id))"#,
    r#"CREATE TABLE IF NOT EXISTS sensor.sensor_battery (
        id INT PRIMARY KEY,
        battery_level DOUBLE)"#,
];

pub struct ScyllaRollupStore {
    session: Session,
    schema: OnceCell<()>,
}

impl ScyllaRollupStore {
    pub async fn connect(hosts: &[String]) -> Result<Self, StoreError> {
        let mut builder = SessionBuilder::new();
        for host in hosts {
            builder = builder.known_node(host);
        }
        let session = builder.build().await.map_err(StoreError::wide_column)?;
        Ok(ScyllaRollupStore {
            session,
            schema: OnceCell::new(),
        })
    }
}

fn typed_rows<RowT>(result: QueryResult) -> Result<Vec<RowT>, StoreError>
where
    RowT: FromRow,
{
    result
        .rows_typed::<RowT>()
        .map_err(StoreError::wide_column)?
        .map(|row| row.map_err(StoreError::wide_column))
        .collect()
}

#[async_trait]
impl RollupStore for ScyllaRollupStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    self.session
                        .query(statement, ())
                        .await
                        .map_err(StoreError::wide_column)?;
                }
                info!(store = super::ROLLUPS, "Ensured keyspace sensor");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    async fn insert_temperature(
        &self,
        id: i32,
        last_seen: DateTime<Utc>,
        temperature: f64,
    ) -> Result<(), StoreError> {
        self.session
            .query(
                "INSERT INTO sensor.sensor_temperature (id, last_seen, temperature) VALUES (?, ?, ?)",
                (id, CqlTimestamp(last_seen.timestamp_millis()), temperature),
            )
            .await
            .map_err(StoreError::wide_column)?;
        Ok(())
    }

    async fn insert_type(&self, id: i32, sensor_type: &str) -> Result<(), StoreError> {
        self.session
            .query(
                "INSERT INTO sensor.sensor_type (id, type) VALUES (?, ?)",
                (id, sensor_type),
            )
            .await
            .map_err(StoreError::wide_column)?;
        Ok(())
    }

    async fn insert_battery(&self, id: i32, battery_level: f64) -> Result<(), StoreError> {
        self.session
            .query(
                "INSERT INTO sensor.sensor_battery (id, battery_level) VALUES (?, ?)",
                (id, battery_level),
            )
            .await
            .map_err(StoreError::wide_column)?;
        Ok(())
    }

    async fn aggregate_temperature(&self) -> Result<Vec<TemperatureAggregate>, StoreError> {
        let result = self
            .session
            .query(
                r#"SELECT id, min(temperature), max(temperature), avg(temperature)
                    FROM sensor.sensor_temperature GROUP BY id"#,
                (),
            )
            .await
            .map_err(StoreError::wide_column)?;
        let rows = typed_rows::<(i32, f64, f64, f64)>(result)?;
        Ok(rows
            .into_iter()
            .map(|(id, min, max, avg)| TemperatureAggregate { id, min, max, avg })
            .collect())
    }

    async fn count_by_type(&self) -> Result<Vec<TypeCount>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT type, count(*) FROM sensor.sensor_type GROUP BY type",
                (),
            )
            .await
            .map_err(StoreError::wide_column)?;
        let rows = typed_rows::<(String, i64)>(result)?;
        Ok(rows
            .into_iter()
            .map(|(sensor_type, quantity)| TypeCount {
                sensor_type,
                quantity,
            })
            .collect())
    }

    async fn low_battery(&self, threshold: f64) -> Result<Vec<BatteryReading>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT id, battery_level FROM sensor.sensor_battery WHERE battery_level < ? ALLOW FILTERING",
                (threshold,),
            )
            .await
            .map_err(StoreError::wide_column)?;
        let rows = typed_rows::<(i32, f64)>(result)?;
        Ok(rows
            .into_iter()
            .map(|(id, battery_level)| BatteryReading { id, battery_level })
            .collect())
    }
}
