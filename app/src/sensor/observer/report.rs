use super::ConcurrentObserver;
use crate::error::GatewayError;
use crate::store::ROLLUPS;

use senser_core::{LowBatteryReport, Sensor, TemperatureReport, TypeCount};
use std::sync::Arc;
use tracing::warn;

/// Cross sensor statistics computed by the rollup store
pub struct AggregationReporter {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for AggregationReporter {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl AggregationReporter {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        AggregationReporter { inner }
    }

    #[tracing::instrument(skip(self))]
    pub async fn temperature_stats(&self) -> Result<Vec<TemperatureReport>, GatewayError> {
        let stores = &self.inner.stores;
        let aggregates = self
            .inner
            .call(
                ROLLUPS,
                "aggregate_temperature",
                stores.rollups.aggregate_temperature(),
            )
            .await?;

        let mut reports = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates.iter() {
            if let Some(sensor) = self.enrich(aggregate.id).await? {
                reports.push(TemperatureReport::new(sensor, aggregate));
            }
        }
        Ok(reports)
    }

    #[tracing::instrument(skip(self))]
    pub async fn count_by_type(&self) -> Result<Vec<TypeCount>, GatewayError> {
        let stores = &self.inner.stores;
        Ok(self
            .inner
            .call(ROLLUPS, "count_by_type", stores.rollups.count_by_type())
            .await?)
    }

    /// Sensors whose latest battery reading is strictly below `threshold`
    #[tracing::instrument(skip(self))]
    pub async fn low_battery(&self, threshold: f64) -> Result<Vec<LowBatteryReport>, GatewayError> {
        if !threshold.is_finite() {
            return Err(GatewayError::InvalidArgument(
                "Threshold must be a number".to_owned(),
            ));
        }

        let stores = &self.inner.stores;
        let readings = self
            .inner
            .call(ROLLUPS, "low_battery", stores.rollups.low_battery(threshold))
            .await?;

        let mut reports = Vec::with_capacity(readings.len());
        for reading in readings {
            if let Some(sensor) = self.enrich(reading.id).await? {
                reports.push(LowBatteryReport {
                    sensor,
                    battery_level: reading.battery_level,
                });
            }
        }
        Ok(reports)
    }

    /// Rows of removed or broken sensors are dropped from reports
    async fn enrich(&self, sensor_id: i32) -> Result<Option<Sensor>, GatewayError> {
        match self.inner.assemble(sensor_id).await {
            Ok(sensor) => Ok(Some(sensor)),
            Err(GatewayError::NotFound(_)) | Err(GatewayError::InconsistentState(_)) => {
                warn!(sensor_id = sensor_id, "Skipped report row without sensor");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
