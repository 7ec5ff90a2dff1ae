use super::ConcurrentObserver;
use crate::error::{GatewayError, StoreError};
use crate::store::{CACHE, ROLLUPS, TIMESERIES};

use senser_core::{SensorTelemetry, TelemetrySample, TimeSeriesRow};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Steps of a telemetry record, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    CacheWrite,
    CacheRead,
    Assemble,
    TimeSeries,
    RollupSchema,
    RollupTemperature,
    RollupType,
    RollupBattery,
}

impl RecordStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStage::CacheWrite => "cache_write",
            RecordStage::CacheRead => "cache_read",
            RecordStage::Assemble => "assemble",
            RecordStage::TimeSeries => "timeseries_insert",
            RecordStage::RollupSchema => "rollup_schema",
            RecordStage::RollupTemperature => "rollup_temperature",
            RecordStage::RollupType => "rollup_type",
            RecordStage::RollupBattery => "rollup_battery",
        }
    }
}

struct StageError {
    stage: RecordStage,
    cause: GatewayError,
}

trait AtStage<T> {
    fn at(self, stage: RecordStage) -> Result<T, StageError>;
}

impl<T, E: Into<GatewayError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: RecordStage) -> Result<T, StageError> {
        self.map_err(|err| StageError {
            stage,
            cause: err.into(),
        })
    }
}

pub struct TelemetryWriter {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for TelemetryWriter {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl TelemetryWriter {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        TelemetryWriter { inner }
    }

    /// Fans a sample out to cache, time-series and rollup stores
    ///
    /// Any failure is reported as `NotFound`, stores written before the
    /// failing stage keep their data.
    #[tracing::instrument(skip(self, sample))]
    pub async fn record(
        &self,
        sensor_id: i32,
        sample: TelemetrySample,
    ) -> Result<SensorTelemetry, GatewayError> {
        match self.run(sensor_id, &sample).await {
            Ok(view) => {
                info!(sensor_id = sensor_id, "Recorded telemetry");
                Ok(view)
            }
            Err(StageError { stage, cause }) => {
                if let GatewayError::InconsistentState(_) = cause {
                    error!(
                        sensor_id = sensor_id,
                        stage = stage.as_str(),
                        "Telemetry for a sensor without metadata"
                    );
                } else {
                    warn!(
                        sensor_id = sensor_id,
                        stage = stage.as_str(),
                        error = %cause,
                        "Aborted telemetry record"
                    );
                }
                Err(GatewayError::NotFound(sensor_id))
            }
        }
    }

    async fn run(
        &self,
        sensor_id: i32,
        sample: &TelemetrySample,
    ) -> Result<SensorTelemetry, StageError> {
        let inner = &self.inner;
        let stores = &inner.stores;

        // 1. Stage the sample, last write wins
        let payload = serde_json::to_string(sample)
            .map_err(StoreError::from)
            .at(RecordStage::CacheWrite)?;
        inner
            .call(CACHE, "put", stores.cache.put(sensor_id, payload))
            .await
            .at(RecordStage::CacheWrite)?;

        // 2. Confirm the write by reading it back
        let confirmed = inner
            .latest_sample(sensor_id)
            .await
            .at(RecordStage::CacheRead)?
            .ok_or(GatewayError::NotFound(sensor_id))
            .at(RecordStage::CacheRead)?;

        // 3. + 4.
        let sensor = inner.assemble(sensor_id).await.at(RecordStage::Assemble)?;
        let view = SensorTelemetry {
            sensor,
            telemetry: Some(confirmed),
        };

        // 5.
        let row = TimeSeriesRow::from(sample);
        inner
            .call(
                TIMESERIES,
                "insert_sample",
                stores.timeseries.insert_sample(sensor_id, &row),
            )
            .await
            .at(RecordStage::TimeSeries)?;

        // 6.
        inner
            .call(ROLLUPS, "ensure_schema", stores.rollups.ensure_schema())
            .await
            .at(RecordStage::RollupSchema)?;

        // 7.
        if let Some(temperature) = sample.temperature {
            inner
                .call(
                    ROLLUPS,
                    "insert_temperature",
                    stores
                        .rollups
                        .insert_temperature(sensor_id, sample.last_seen, temperature),
                )
                .await
                .at(RecordStage::RollupTemperature)?;
        }

        // 8. Type comes from the assembled view
        inner
            .call(
                ROLLUPS,
                "insert_type",
                stores
                    .rollups
                    .insert_type(sensor_id, &view.sensor.sensor_type),
            )
            .await
            .at(RecordStage::RollupType)?;

        // 9. Replaces the previous reading
        inner
            .call(
                ROLLUPS,
                "insert_battery",
                stores.rollups.insert_battery(sensor_id, sample.battery_level),
            )
            .await
            .at(RecordStage::RollupBattery)?;

        Ok(view)
    }
}
