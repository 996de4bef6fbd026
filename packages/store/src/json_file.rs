//! JSON-file-backed listing store.
//!
//! Persists the whole [`StoreData`] document to one pretty-printed JSON
//! file after every mutation. Suits the CLI's single-user, hundreds-of-
//! properties scale; anything bigger belongs behind a real database
//! implementation of [`ListingStore`].

use async_trait::async_trait;
use rental_sync_models::{FloorPlan, ImportSource, Property, Unit};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::{ListingStore, StoreData, StoreError};

/// A [`ListingStore`] persisted to a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl JsonFileStore {
    /// Opens (or initializes) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if an existing file cannot be read or
    /// parsed.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let data = if tokio::fs::try_exists(path).await? {
            let text = tokio::fs::read_to_string(path).await?;
            serde_json::from_str(&text)?
        } else {
            log::info!("Initializing new listing store at {}", path.display());
            StoreData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            data: RwLock::new(data),
        })
    }

    async fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl ListingStore for JsonFileStore {
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
        let mut data = self.data.write().await;
        data.insert_property(property)?;
        self.persist(&data).await
    }

    async fn update_property(&self, property: &Property) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        data.update_property(property)?;
        self.persist(&data).await
    }

    async fn delete_by_source(&self, source: ImportSource) -> Result<u64, StoreError> {
        let mut data = self.data.write().await;
        let removed = data.delete_by_source(source);
        self.persist(&data).await?;
        Ok(removed)
    }

    async fn insert_floor_plan(&self, plan: &FloorPlan) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        data.insert_floor_plan(plan)?;
        self.persist(&data).await
    }

    async fn insert_units(&self, units: &[Unit]) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let result = data.insert_units(units);
        // Persist even on a duplicate conflict: units inserted before
        // the conflict stay, matching the no-rollback batch contract.
        self.persist(&data).await?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn property(id: &str) -> Property {
        Property {
            id: id.to_string(),
            name: id.to_string(),
            street_address: "100 Main St".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip: None,
            latitude: None,
            longitude: None,
            rent_min: None,
            rent_max: None,
            beds_min: None,
            beds_max: None,
            baths_min: None,
            baths_max: None,
            sqft_min: None,
            sqft_max: None,
            photos: Vec::new(),
            source: ImportSource::CsvUpload,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = std::env::temp_dir().join(format!("rental-sync-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("store.json");
        let _ = tokio::fs::remove_file(&path).await;

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.insert_property(&property("p1")).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let all = reopened.list_properties().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "p1");

        let _ = tokio::fs::remove_file(&path).await;
    }
}
