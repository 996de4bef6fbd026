//! In-memory listing store.
//!
//! Backs tests and short-lived runs; state lives only as long as the
//! process.

use async_trait::async_trait;
use rental_sync_models::{FloorPlan, ImportSource, Property, Unit};
use tokio::sync::RwLock;

use crate::{ListingStore, StoreData, StoreError};

/// A [`ListingStore`] backed by in-process maps.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with existing entities (for
    /// exercising dedup against prior state).
    #[must_use]
    pub fn with_data(data: StoreData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn list_properties(&self) -> Result<Vec<Property>, StoreError> {
        Ok(self.data.read().await.properties.values().cloned().collect())
    }

    async fn list_floor_plans(&self) -> Result<Vec<FloorPlan>, StoreError> {
        Ok(self.data.read().await.floor_plans.values().cloned().collect())
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StoreError> {
        Ok(self.data.read().await.units.values().cloned().collect())
    }

    async fn insert_property(&self, property: &Property) -> Result<(), StoreError> {
        self.data.write().await.insert_property(property)
    }

    async fn update_property(&self, property: &Property) -> Result<(), StoreError> {
        self.data.write().await.update_property(property)
    }

    async fn delete_by_source(&self, source: ImportSource) -> Result<u64, StoreError> {
        Ok(self.data.write().await.delete_by_source(source))
    }

    async fn insert_floor_plan(&self, plan: &FloorPlan) -> Result<(), StoreError> {
        self.data.write().await.insert_floor_plan(plan)
    }

    async fn insert_units(&self, units: &[Unit]) -> Result<(), StoreError> {
        self.data.write().await.insert_units(units)
    }
}
