use crate::error::{GatewayError, StoreError};
use crate::store::{Stores, CACHE, DOCUMENTS, IDENTITY};

use senser_core::{Sensor, TelemetrySample};
use std::fmt::Debug;
use std::future::Future;
use std::{sync::Arc, time::Duration};
use tracing::{error, warn};

pub mod controller;
pub mod reader;
pub mod report;
pub mod writer;

/// Shared state of all observers, the store handles and the per-call timeout
pub struct ConcurrentObserver {
    pub(crate) stores: Stores,
    timeout: Duration,
}

impl Debug for ConcurrentObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentObserver")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConcurrentObserver {
    pub fn new(stores: Stores, timeout: Duration) -> Arc<Self> {
        Arc::new(ConcurrentObserver { stores, timeout })
    }

    /// Runs a single store call under the per-call timeout
    ///
    /// Elapsed calls fail as `StoreError::Timeout` and are never retried.
    /// Every failure is logged with the store and operation it happened in.
    pub(crate) async fn call<T, F>(
        &self,
        store: &'static str,
        op: &'static str,
        fut: F,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout { store, op }),
        };
        if let Err(err) = &result {
            warn!(store = store, op = op, error = %err, "Store call failed");
        }
        result
    }

    /// Merges identity and metadata of a sensor into one view
    ///
    /// Both lookups run concurrently, the identity result decides first so an
    /// unknown id is always `NotFound`. An identity without metadata is
    /// `InconsistentState`.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn assemble(&self, sensor_id: i32) -> Result<Sensor, GatewayError> {
        let (identity, metadata) = tokio::join!(
            self.call(
                IDENTITY,
                "get_by_id",
                self.stores.identity.get_by_id(sensor_id)
            ),
            self.call(DOCUMENTS, "get", self.stores.documents.get(sensor_id)),
        );

        let identity = identity?.ok_or(GatewayError::NotFound(sensor_id))?;
        let metadata = match metadata? {
            Some(metadata) => metadata,
            None => {
                error!(sensor_id = sensor_id, "Sensor has an identity but no metadata");
                return Err(GatewayError::InconsistentState(sensor_id));
            }
        };
        Ok(Sensor::assemble(identity, metadata)?)
    }

    /// Lookup by the unique sensor name, only used to guard registration
    pub(crate) async fn assemble_by_name(&self, name: &str) -> Result<Option<Sensor>, GatewayError> {
        let identity = self
            .call(IDENTITY, "get_by_name", self.stores.identity.get_by_name(name))
            .await?;
        match identity {
            Some(identity) => self.assemble(identity.id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Reachability of the identity store, which decides sensor existence
    pub async fn check_identity_store(&self) -> bool {
        self.call(IDENTITY, "list", self.stores.identity.list(0, 1))
            .await
            .is_ok()
    }

    /// Latest cached sample, absent if the sensor never reported
    pub(crate) async fn latest_sample(
        &self,
        sensor_id: i32,
    ) -> Result<Option<TelemetrySample>, StoreError> {
        let payload = self
            .call(CACHE, "get", self.stores.cache.get(sensor_id))
            .await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}
