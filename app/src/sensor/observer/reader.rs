use super::ConcurrentObserver;
use crate::error::{GatewayError, StoreError};
use crate::store::{DOCUMENTS, IDENTITY, SEARCH, TIMESERIES};

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use senser_core::error::QueryError;
use senser_core::search::{SearchMode, SearchRequest, StructuredQuery};
use senser_core::{Bucket, BucketWidth, GeoPoint, Sensor, SensorTelemetry};
use std::sync::Arc;
use tracing::{debug, warn};

/// Range queried when the caller leaves `from` open
pub const DEFAULT_RANGE_HOURS: i64 = 24;

pub struct TelemetryReader {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for TelemetryReader {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl TelemetryReader {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        TelemetryReader { inner }
    }

    /// Aggregates the samples of `[from, to]` into ascending buckets
    ///
    /// Argument errors are `InvalidArgument`, every store failure is `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn query_range(
        &self,
        sensor_id: i32,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        bucket: Option<&str>,
    ) -> Result<Vec<Bucket>, GatewayError> {
        let width = match bucket {
            Some(raw) => raw.parse::<BucketWidth>()?,
            None => BucketWidth::default(),
        };
        let to = to.unwrap_or_else(Utc::now);
        let from = from.unwrap_or(to - Duration::hours(DEFAULT_RANGE_HOURS));
        if from > to {
            return Err(QueryError::InvalidRange(format!("{} is after {}", from, to)).into());
        }

        let stores = &self.inner.stores;
        self.inner
            .call(IDENTITY, "get_by_id", stores.identity.get_by_id(sensor_id))
            .await
            .map_err(|_| GatewayError::NotFound(sensor_id))?
            .ok_or(GatewayError::NotFound(sensor_id))?;

        let buckets = self
            .inner
            .call(
                TIMESERIES,
                "bucketed_query",
                stores.timeseries.bucketed_query(sensor_id, from, to, width),
            )
            .await
            .map_err(|_| GatewayError::NotFound(sensor_id))?;
        debug!(sensor_id = sensor_id, buckets = buckets.len(), "Queried range");
        Ok(buckets)
    }

    /// Sensors within `radius_m` meters, nearest first, each with its latest sample
    #[tracing::instrument(skip(self))]
    pub async fn near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Result<Vec<SensorTelemetry>, GatewayError> {
        let point = GeoPoint::new(latitude, longitude);
        if !point.is_valid() {
            return Err(GatewayError::InvalidArgument(
                "Latitude or longitude out of range".to_owned(),
            ));
        }
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(GatewayError::InvalidArgument(
                "Radius must be a non-negative number of meters".to_owned(),
            ));
        }

        let stores = &self.inner.stores;
        let hits = self
            .inner
            .call(DOCUMENTS, "geo_near", stores.documents.geo_near(point, radius_m))
            .await?;

        let views = try_join_all(hits.iter().map(|hit| self.latest_view(hit.id))).await?;
        Ok(views.into_iter().flatten().collect())
    }

    /// Sensors matching a single-field expression such as `{"name": "sn-1"}`
    #[tracing::instrument(skip(self))]
    pub async fn search(
        &self,
        expression: &str,
        size: usize,
        search_mode: &str,
    ) -> Result<Vec<Sensor>, GatewayError> {
        let query: StructuredQuery = expression.parse()?;
        let mode: SearchMode = search_mode.parse()?;
        let request = SearchRequest::new(query, mode, size)?;

        let stores = &self.inner.stores;
        self.inner
            .call(SEARCH, "ensure_index", stores.search.ensure_index())
            .await?;
        let mut hits = self
            .inner
            .call(SEARCH, "search", stores.search.search(&request))
            .await?;
        hits.truncate(size);

        let sensors = try_join_all(hits.into_iter().map(|id| self.indexed_sensor(id))).await?;
        Ok(sensors.into_iter().flatten().collect())
    }

    async fn latest_view(&self, sensor_id: i32) -> Result<Option<SensorTelemetry>, GatewayError> {
        let sensor = match self.inner.assemble(sensor_id).await {
            Ok(sensor) => sensor,
            Err(GatewayError::NotFound(_)) => {
                warn!(sensor_id = sensor_id, "Skipped location of a removed sensor");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let telemetry = match self.inner.latest_sample(sensor_id).await {
            Ok(telemetry) => telemetry,
            Err(StoreError::Parse(err)) => {
                warn!(sensor_id = sensor_id, error = %err, "Ignored undecodable cached sample");
                None
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Some(SensorTelemetry { sensor, telemetry }))
    }

    async fn indexed_sensor(&self, sensor_id: i32) -> Result<Option<Sensor>, GatewayError> {
        match self.inner.assemble(sensor_id).await {
            Ok(sensor) => Ok(Some(sensor)),
            Err(GatewayError::NotFound(_)) | Err(GatewayError::InconsistentState(_)) => {
                warn!(sensor_id = sensor_id, "Skipped search hit without sensor");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
