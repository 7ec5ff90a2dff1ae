use super::ConcurrentObserver;
use crate::error::{GatewayError, StoreError};
use crate::store::{DOCUMENTS, IDENTITY, SEARCH};

use senser_core::search::SearchDocument;
use senser_core::{Sensor, SensorIdentity, SensorRegistration};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct SensorObserver {
    inner: Arc<ConcurrentObserver>,
}

impl Clone for SensorObserver {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl SensorObserver {
    pub fn new(inner: Arc<ConcurrentObserver>) -> Self {
        SensorObserver { inner }
    }

    /// Creates identity, metadata and search document of a new sensor, in that order
    ///
    /// Nothing is rolled back, a failure after the identity insert leaves an
    /// identity without metadata behind.
    #[tracing::instrument(skip(self, registration), fields(name = %registration.name))]
    pub async fn register(&self, registration: SensorRegistration) -> Result<Sensor, GatewayError> {
        if registration.name.trim().is_empty() {
            return Err(GatewayError::InvalidArgument(
                "Sensor name must not be empty".to_owned(),
            ));
        }
        if !registration.location().is_valid() {
            return Err(GatewayError::InvalidArgument(
                "Latitude or longitude out of range".to_owned(),
            ));
        }

        // Unique name
        match self.inner.assemble_by_name(&registration.name).await {
            Ok(None) => {}
            Ok(Some(_)) | Err(GatewayError::InconsistentState(_)) => {
                return Err(GatewayError::Conflict(registration.name.clone()));
            }
            Err(err) => return Err(err),
        }

        let stores = &self.inner.stores;
        let identity = match self
            .inner
            .call(IDENTITY, "create", stores.identity.create(&registration.name))
            .await
        {
            Ok(identity) => identity,
            Err(StoreError::Duplicate(name)) => return Err(GatewayError::Conflict(name)),
            Err(err) => return Err(err.into()),
        };
        let sensor_id = identity.id;

        let metadata = registration.metadata(sensor_id);
        if let Err(err) = self
            .inner
            .call(DOCUMENTS, "upsert", stores.documents.upsert(&metadata))
            .await
        {
            error!(sensor_id = sensor_id, "Registered identity without metadata");
            return Err(err.into());
        }

        let doc = SearchDocument {
            id: sensor_id,
            name: identity.name.clone(),
            sensor_type: metadata.sensor_type.clone(),
            description: metadata.description.clone(),
        };
        self.inner
            .call(SEARCH, "ensure_index", stores.search.ensure_index())
            .await?;
        self.inner
            .call(SEARCH, "index_document", stores.search.index_document(&doc))
            .await?;

        let sensor = self.inner.assemble(sensor_id).await?;
        info!(sensor_id = sensor_id, "Registered new sensor");
        Ok(sensor)
    }

    pub async fn get(&self, sensor_id: i32) -> Result<Sensor, GatewayError> {
        let sensor = self.inner.assemble(sensor_id).await?;
        debug!(sensor_id = sensor_id, "Fetched sensor");
        Ok(sensor)
    }

    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<SensorIdentity>, GatewayError> {
        if skip < 0 || limit < 0 {
            return Err(GatewayError::InvalidArgument(
                "skip and limit must not be negative".to_owned(),
            ));
        }
        let stores = &self.inner.stores;
        Ok(self
            .inner
            .call(IDENTITY, "list", stores.identity.list(skip, limit))
            .await?)
    }

    /// Removes the identity only, every other store keeps its data for this id
    #[tracing::instrument(skip(self))]
    pub async fn unregister(&self, sensor_id: i32) -> Result<SensorIdentity, GatewayError> {
        let stores = &self.inner.stores;
        let identity = self
            .inner
            .call(IDENTITY, "get_by_id", stores.identity.get_by_id(sensor_id))
            .await?
            .ok_or(GatewayError::NotFound(sensor_id))?;

        let removed = self
            .inner
            .call(IDENTITY, "delete", stores.identity.delete(sensor_id))
            .await?;
        if !removed {
            return Err(GatewayError::NotFound(sensor_id));
        }

        info!(sensor_id = sensor_id, "Removed sensor identity");
        Ok(identity)
    }
}
