#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence boundary for the rental listing pipeline.
//!
//! The ingest orchestrator only needs simple create/read/update/delete
//! operations keyed by id, so the whole storage backend sits behind the
//! [`ListingStore`] trait. Two implementations ship with the workspace:
//! [`memory::MemoryStore`] for tests and [`json_file::JsonFileStore`]
//! for the CLI. Production deployments plug their own database in at
//! this seam.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use rental_sync_models::{FloorPlan, ImportSource, Property, Unit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors from listing store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An entity with this id already exists.
    #[error("Duplicate {entity} id: {id}")]
    Duplicate {
        /// Entity kind ("property", "floor plan", "unit").
        entity: &'static str,
        /// The conflicting id.
        id: String,
    },

    /// No entity with this id exists.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// The missing id.
        id: String,
    },

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error from a file-backed store.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("Store error: {message}")]
    Backend {
        /// Description of what went wrong.
        message: String,
    },
}

/// CRUD surface the ingest pipeline requires from a storage backend.
///
/// Floor plans and units carry foreign keys to ids generated by the
/// prior create step, so callers persist property → floor plans →
/// units, in that order.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Returns all stored properties.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    async fn list_properties(&self) -> Result<Vec<Property>, StoreError>;

    /// Returns all stored floor plans.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    async fn list_floor_plans(&self) -> Result<Vec<FloorPlan>, StoreError>;

    /// Returns all stored units.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    async fn list_units(&self) -> Result<Vec<Unit>, StoreError>;

    /// Creates a property.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id already exists.
    async fn insert_property(&self, property: &Property) -> Result<(), StoreError>;

    /// Replaces an existing property.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the id does not exist.
    async fn update_property(&self, property: &Property) -> Result<(), StoreError>;

    /// Deletes every property created by `source`, cascading to its
    /// floor plans and units. Returns the number of properties removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend write fails.
    async fn delete_by_source(&self, source: ImportSource) -> Result<u64, StoreError>;

    /// Creates a floor plan.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id already exists.
    async fn insert_floor_plan(&self, plan: &FloorPlan) -> Result<(), StoreError>;

    /// Creates a batch of units for one floor plan. On failure,
    /// already-inserted units from the batch are left in place (no
    /// rollback spans the batch).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] on the first conflicting id.
    async fn insert_units(&self, units: &[Unit]) -> Result<(), StoreError>;
}

/// In-memory entity tables shared by the bundled store backends. Also
/// the on-disk schema of [`json_file::JsonFileStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    /// Properties by id.
    pub properties: BTreeMap<String, Property>,
    /// Floor plans by id.
    pub floor_plans: BTreeMap<String, FloorPlan>,
    /// Units by id.
    pub units: BTreeMap<String, Unit>,
}

impl StoreData {
    pub(crate) fn insert_property(&mut self, property: &Property) -> Result<(), StoreError> {
        if self.properties.contains_key(&property.id) {
            return Err(StoreError::Duplicate {
                entity: "property",
                id: property.id.clone(),
            });
        }
        self.properties.insert(property.id.clone(), property.clone());
        Ok(())
    }

    pub(crate) fn update_property(&mut self, property: &Property) -> Result<(), StoreError> {
        if !self.properties.contains_key(&property.id) {
            return Err(StoreError::NotFound {
                entity: "property",
                id: property.id.clone(),
            });
        }
        self.properties.insert(property.id.clone(), property.clone());
        Ok(())
    }

    pub(crate) fn delete_by_source(&mut self, source: ImportSource) -> u64 {
        let doomed: Vec<String> = self
            .properties
            .values()
            .filter(|p| p.source == source)
            .map(|p| p.id.clone())
            .collect();

        for id in &doomed {
            self.properties.remove(id);
        }
        self.floor_plans
            .retain(|_, plan| !doomed.contains(&plan.property_id));
        self.units
            .retain(|_, unit| !doomed.contains(&unit.property_id));

        doomed.len() as u64
    }

    pub(crate) fn insert_floor_plan(&mut self, plan: &FloorPlan) -> Result<(), StoreError> {
        if self.floor_plans.contains_key(&plan.id) {
            return Err(StoreError::Duplicate {
                entity: "floor plan",
                id: plan.id.clone(),
            });
        }
        self.floor_plans.insert(plan.id.clone(), plan.clone());
        Ok(())
    }

    pub(crate) fn insert_units(&mut self, units: &[Unit]) -> Result<(), StoreError> {
        for unit in units {
            if self.units.contains_key(&unit.id) {
                return Err(StoreError::Duplicate {
                    entity: "unit",
                    id: unit.id.clone(),
                });
            }
            self.units.insert(unit.id.clone(), unit.clone());
        }
        Ok(())
    }
}
