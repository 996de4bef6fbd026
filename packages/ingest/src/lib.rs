#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Import orchestrator: pulls raw listings from a source adapter,
//! groups them by property, resolves duplicates against the store, and
//! persists the property / floor plan / unit hierarchy.
//!
//! Failures below the run level are contained: a bad property group or
//! floor plan batch is recorded in the run's [`ImportResult`] and the
//! walk continues. Only source fetch/parse failures and the initial
//! store scan abort the run.

use chrono::Utc;
use rental_sync_address::property_id;
use rental_sync_geocoder::Geocoder;
use rental_sync_models::{
    ErrorContext, FloorPlan, ImportError, ImportPolicy, ImportResult, ImportSource, Property, Unit,
};
use rental_sync_source::api::{ListingsApiClient, ListingsQuery};
use rental_sync_source::csv;
use rental_sync_source::progress::ProgressCallback;
use rental_sync_source::{FetchOptions, SourceError};
use rental_sync_store::{ListingStore, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub mod aggregate;
pub mod dedup;
pub mod grouping;
pub mod progress_bar;

use aggregate::{PropertyAggregate, aggregate_group, partition_floor_plans, unit_available};
use dedup::ExistingIndex;
use grouping::{PropertyGroup, group_records};

/// Pause between successive geocode lookups, to stay inside public
/// provider rate limits.
pub const GEOCODE_DELAY_MS: u64 = 150;

/// Fatal import failure. Per-item failures are reported through
/// [`ImportResult::errors`] instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Caller knobs for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Stop fetching from the API after this many listings.
    pub limit: Option<u64>,
    /// Delay between API page fetches in milliseconds.
    pub page_delay_ms: Option<u64>,
    /// Cooperative cancellation flag, checked between property groups.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ImportOptions {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Full API resync: fetches every matching listing, deletes the
/// properties a previous API sync created, then imports the fresh
/// snapshot. Properties owned by other sources are refreshed in place,
/// never deleted.
///
/// # Errors
///
/// Returns [`IngestError`] if the fetch fails or the store cannot be
/// read. Per-property persistence failures are recorded in the result.
pub async fn sync_from_api(
    store: &dyn ListingStore,
    geocoder: Option<&dyn Geocoder>,
    client: &ListingsApiClient,
    query: &ListingsQuery,
    options: &ImportOptions,
    progress: &dyn ProgressCallback,
) -> Result<ImportResult, IngestError> {
    let fetch_options = FetchOptions {
        limit: options.limit,
        page_delay_ms: options.page_delay_ms,
    };
    let records = client.fetch_all(query, &fetch_options, progress).await?;

    progress.report("Removing previous API sync results", 0, 0);
    let removed = store.delete_by_source(ImportSource::RentalApi).await?;
    if removed > 0 {
        log::info!("Removed {removed} properties from the previous API sync");
    }

    run_import(
        store,
        geocoder,
        records,
        ImportPolicy::ReplaceExisting,
        ImportSource::RentalApi,
        options,
        progress,
        ImportResult::new(),
    )
    .await
}

/// Imports a CSV availability upload. Existing properties are never
/// modified; only unseen units are added under them.
///
/// Rows that fail validation are recorded per-row and skipped; missing
/// required headers or an empty file abort the run.
///
/// # Errors
///
/// Returns [`IngestError`] if the CSV is structurally invalid or the
/// store cannot be read.
pub async fn import_csv(
    store: &dyn ListingStore,
    geocoder: Option<&dyn Geocoder>,
    text: &str,
    options: &ImportOptions,
    progress: &dyn ProgressCallback,
) -> Result<ImportResult, IngestError> {
    progress.report("Parsing CSV upload", 0, 0);
    let outcome = csv::parse_records(text)?;

    let mut result = ImportResult::new();
    for (row, message) in outcome.row_errors {
        result.errors.push(ImportError {
            context: ErrorContext::Row(row),
            message,
        });
    }

    run_import(
        store,
        geocoder,
        outcome.records,
        ImportPolicy::SkipExisting,
        ImportSource::CsvUpload,
        options,
        progress,
        result,
    )
    .await
}

fn build_property(
    id: String,
    name: String,
    agg: &PropertyAggregate,
    group: &PropertyGroup,
    source: ImportSource,
) -> Property {
    let first = group.records.first();
    let now = Utc::now();
    Property {
        id,
        name,
        street_address: agg.display_address.clone(),
        city: first.map(|r| r.city.clone()).unwrap_or_default(),
        state: first.map(|r| r.state.clone()).unwrap_or_default(),
        zip: first.and_then(|r| r.zip.clone()),
        latitude: agg.latitude,
        longitude: agg.longitude,
        rent_min: agg.rent_min,
        rent_max: agg.rent_max,
        beds_min: agg.beds_min,
        beds_max: agg.beds_max,
        baths_min: agg.baths_min,
        baths_max: agg.baths_max,
        sqft_min: agg.sqft_min,
        sqft_max: agg.sqft_max,
        photos: agg.photos.clone(),
        source,
        created_at: now,
        updated_at: now,
    }
}

#[allow(
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::cast_possible_truncation
)]
async fn run_import(
    store: &dyn ListingStore,
    geocoder: Option<&dyn Geocoder>,
    records: Vec<rental_sync_models::RawListingRecord>,
    policy: ImportPolicy,
    source: ImportSource,
    options: &ImportOptions,
    progress: &dyn ProgressCallback,
    mut result: ImportResult,
) -> Result<ImportResult, IngestError> {
    let record_count = records.len();
    let groups = group_records(records);
    let total = groups.len() as u64;
    progress.report(
        &format!("Grouped {record_count} listings into {} properties", groups.len()),
        0,
        total,
    );

    let mut index = ExistingIndex::load(store).await?;
    let mut geocode_attempts: u64 = 0;

    for (position, group) in groups.iter().enumerate() {
        if options.is_cancelled() {
            log::warn!(
                "Import cancelled after {} of {total} properties",
                position
            );
            result.success = false;
            break;
        }

        let Some(first) = group.records.first() else {
            continue;
        };
        let agg = aggregate_group(group);
        let name = first
            .property_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| agg.display_address.clone());
        progress.report(
            &format!("Processing '{name}'"),
            position as u64 + 1,
            total,
        );

        let existing = index.resolve(&name, &agg.display_address, &first.city).cloned();
        let property_id = match existing {
            Some(existing) if policy == ImportPolicy::SkipExisting => {
                log::debug!("Property '{name}' already exists, adding new units only");
                result.properties_skipped += 1;
                existing.id
            }
            Some(existing) => {
                // Refresh aggregates in place; ownership and creation
                // time stay with the original source.
                let refreshed = Property {
                    street_address: agg.display_address.clone(),
                    latitude: agg.latitude.or(existing.latitude),
                    longitude: agg.longitude.or(existing.longitude),
                    rent_min: agg.rent_min,
                    rent_max: agg.rent_max,
                    beds_min: agg.beds_min,
                    beds_max: agg.beds_max,
                    baths_min: agg.baths_min,
                    baths_max: agg.baths_max,
                    sqft_min: agg.sqft_min,
                    sqft_max: agg.sqft_max,
                    photos: agg.photos.clone(),
                    updated_at: Utc::now(),
                    ..existing
                };
                if let Err(error) = store.update_property(&refreshed).await {
                    result.errors.push(ImportError {
                        context: ErrorContext::Property(name.clone()),
                        message: error.to_string(),
                    });
                    continue;
                }
                result.properties_skipped += 1;
                index.register_property(&refreshed);
                refreshed.id
            }
            None => {
                let id = property_id(&group.key, &first.city, &first.state);
                let mut property = build_property(id, name.clone(), &agg, group, source);

                if property.latitude.is_none()
                    && let Some(geocoder) = geocoder
                {
                    geocode_attempts += 1;
                    if geocode_attempts > 1 {
                        tokio::time::sleep(Duration::from_millis(GEOCODE_DELAY_MS)).await;
                    }
                    progress.report(
                        &format!("Geocoding '{}'", agg.display_address),
                        position as u64 + 1,
                        total,
                    );
                    match geocoder
                        .geocode(
                            &agg.display_address,
                            &first.city,
                            &first.state,
                            first.zip.as_deref(),
                        )
                        .await
                    {
                        Ok(Some(coordinates)) => {
                            property.latitude = Some(coordinates.latitude);
                            property.longitude = Some(coordinates.longitude);
                            result.geocoded += 1;
                        }
                        Ok(None) => {
                            log::debug!("No geocode match for '{}'", agg.display_address);
                            result.geocode_failed += 1;
                        }
                        Err(error) => {
                            log::warn!(
                                "Geocoding '{}' failed: {error}",
                                agg.display_address
                            );
                            result.geocode_failed += 1;
                        }
                    }
                }

                if let Err(error) = store.insert_property(&property).await {
                    result.errors.push(ImportError {
                        context: ErrorContext::Property(name.clone()),
                        message: error.to_string(),
                    });
                    continue;
                }
                result.properties_created += 1;
                index.register_property(&property);
                property.id
            }
        };

        for plan_group in partition_floor_plans(group) {
            // Pick the new units first so an all-duplicate bucket
            // creates nothing.
            let mut pending: Vec<(String, usize)> = Vec::new();
            for &member in &plan_group.members {
                let record = &group.records[member];
                let unit_number = record
                    .unit_number
                    .clone()
                    .or_else(|| record.extracted_unit.clone())
                    .unwrap_or_else(|| (member + 1).to_string());
                if index.unit_exists(&property_id, &unit_number) {
                    result.units_skipped += 1;
                    continue;
                }
                index.register_unit(&property_id, &unit_number);
                pending.push((unit_number, member));
            }
            if pending.is_empty() {
                continue;
            }

            let plan = FloorPlan {
                id: format!(
                    "{property_id}:fp:{}-{}",
                    plan_group.key.beds, plan_group.key.baths_x2
                ),
                property_id: property_id.clone(),
                name: plan_group.name.clone(),
                beds: plan_group.key.beds,
                baths: plan_group.key.baths(),
                sqft: plan_group.sqft,
                market_rent: plan_group.market_rent,
                starting_at: plan_group.starting_at,
            };
            match store.insert_floor_plan(&plan).await {
                Ok(()) => result.floor_plans_created += 1,
                // Deterministic IDs: a re-import of the same (beds,
                // baths) bucket attaches its units to the stored plan.
                Err(StoreError::Duplicate { .. }) => {
                    log::debug!("Floor plan {} already stored, attaching units", plan.id);
                }
                Err(error) => {
                    result.errors.push(ImportError {
                        context: ErrorContext::FloorPlan(format!("{name}/{}", plan.name)),
                        message: error.to_string(),
                    });
                    continue;
                }
            }

            let units: Vec<Unit> = pending
                .iter()
                .map(|(unit_number, member)| {
                    let record = &group.records[*member];
                    Unit {
                        id: format!("{property_id}:unit:{unit_number}"),
                        property_id: property_id.clone(),
                        floor_plan_id: plan.id.clone(),
                        unit_number: unit_number.clone(),
                        rent: record.price.or(record.starting_at),
                        available_from: record.available_from,
                        available: unit_available(record),
                        status: record.status.clone(),
                        notes: record.description.clone(),
                    }
                })
                .collect();
            match store.insert_units(&units).await {
                Ok(()) => result.units_created += units.len() as u64,
                Err(error) => {
                    result.errors.push(ImportError {
                        context: ErrorContext::FloorPlan(format!("{name}/{}", plan.name)),
                        message: format!("failed to insert units: {error}"),
                    });
                }
            }
        }
    }

    if result.success {
        progress.report("Import complete", total, total);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rental_sync_geocoder::{Coordinates, GeocodeError};
    use rental_sync_models::RawListingRecord;
    use rental_sync_source::progress::NullProgress;
    use rental_sync_store::MemoryStore;
    use std::collections::HashMap;

    fn api_record(address: &str, beds: u32, baths: f64, price: f64) -> RawListingRecord {
        RawListingRecord {
            address: address.to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            beds: Some(beds),
            baths: Some(baths),
            price: Some(price),
            status: Some("Active".to_string()),
            ..RawListingRecord::default()
        }
    }

    async fn import(
        store: &dyn ListingStore,
        records: Vec<RawListingRecord>,
        policy: ImportPolicy,
        source: ImportSource,
    ) -> ImportResult {
        run_import(
            store,
            None,
            records,
            policy,
            source,
            &ImportOptions::default(),
            &NullProgress,
            ImportResult::new(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn designator_variants_collapse_into_one_property() {
        let store = MemoryStore::new();
        let records = vec![
            api_record("100 Main St Unit 4, Austin, TX", 2, 1.0, 1500.0),
            api_record("100 Main St #7, Austin, TX", 2, 1.0, 1600.0),
        ];

        let result = import(&store, records, ImportPolicy::ReplaceExisting, ImportSource::RentalApi)
            .await;

        assert_eq!(result.properties_created, 1);
        assert_eq!(result.floor_plans_created, 1);
        assert_eq!(result.units_created, 2);
        assert!(result.errors.is_empty());

        let properties = store.list_properties().await.unwrap();
        assert_eq!(properties.len(), 1);
        let property = &properties[0];
        assert_eq!(property.street_address, "100 Main St");
        assert_eq!(property.rent_min, Some(1500.0));
        assert_eq!(property.rent_max, Some(1600.0));

        let plans = store.list_floor_plans().await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "2BR/1BA");
        assert_eq!(plans[0].starting_at, Some(1500.0));
        assert_eq!(plans[0].market_rent, Some(1600.0));

        let mut unit_numbers: Vec<String> = store
            .list_units()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.unit_number)
            .collect();
        unit_numbers.sort();
        assert_eq!(unit_numbers, vec!["4", "7"]);
    }

    const CSV_UPLOAD: &str = "\
property_name,market,floor_plan_name,beds,baths,market_rent,starting_at,unit_number,available_from,street_address,state
Sunset Flats,Austin,A1,2,1,1600,1500,4,2025-10-01,100 Main St,TX
Sunset Flats,Austin,A1,2,1,1600,1500,7,2025-10-01,100 Main St,TX
";

    #[tokio::test]
    async fn reimporting_the_same_csv_creates_nothing_new() {
        let store = MemoryStore::new();
        let options = ImportOptions::default();

        let first = import_csv(&store, None, CSV_UPLOAD, &options, &NullProgress)
            .await
            .unwrap();
        assert_eq!(first.properties_created, 1);
        assert_eq!(first.units_created, 2);

        let second = import_csv(&store, None, CSV_UPLOAD, &options, &NullProgress)
            .await
            .unwrap();
        assert_eq!(second.properties_created, 0);
        assert_eq!(second.properties_skipped, 1);
        assert_eq!(second.floor_plans_created, 0);
        assert_eq!(second.units_created, 0);
        assert_eq!(second.units_skipped, 2);
        assert!(second.errors.is_empty());

        assert_eq!(store.list_units().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_csv_row_is_isolated() {
        let csv = "\
property_name,market,floor_plan_name,beds,baths,market_rent,starting_at,unit_number,available_from
Sunset Flats,Austin,A1,2,1,1600,1500,1,2025-10-01
Sunset Flats,Austin,A1,2,1,1600,1500,2,2025-10-01
Sunset Flats,Austin,A1,2,1,1600,1500,,2025-10-01
Sunset Flats,Austin,A1,2,1,1600,1500,4,2025-10-01
Sunset Flats,Austin,A1,2,1,1600,1500,5,2025-10-01
Sunset Flats,Austin,A1,2,1,1600,1500,6,2025-10-01
";
        let store = MemoryStore::new();
        let result = import_csv(&store, None, csv, &ImportOptions::default(), &NullProgress)
            .await
            .unwrap();

        assert_eq!(result.units_created, 5);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].context, ErrorContext::Row(3));
        assert!(result.errors[0].message.contains("unit_number"));
    }

    #[tokio::test]
    async fn duplicate_unit_in_same_batch_is_skipped() {
        let store = MemoryStore::new();
        let mut a = api_record("100 Main St Unit 4, Austin, TX", 2, 1.0, 1500.0);
        a.unit_number = Some("4".to_string());
        let mut b = api_record("100 Main St, Austin, TX", 2, 1.0, 1500.0);
        b.unit_number = Some("4".to_string());

        let result = import(
            &store,
            vec![a, b],
            ImportPolicy::ReplaceExisting,
            ImportSource::RentalApi,
        )
        .await;

        assert_eq!(result.units_created, 1);
        assert_eq!(result.units_skipped, 1);
    }

    #[tokio::test]
    async fn replace_existing_refreshes_but_preserves_ownership() {
        let store = MemoryStore::new();
        import_csv(
            &store,
            None,
            CSV_UPLOAD,
            &ImportOptions::default(),
            &NullProgress,
        )
        .await
        .unwrap();

        let mut record = api_record("100 Main St, Austin, TX", 2, 1.0, 1900.0);
        record.property_name = Some("Sunset Flats".to_string());
        record.unit_number = Some("9".to_string());

        let result = import(
            &store,
            vec![record],
            ImportPolicy::ReplaceExisting,
            ImportSource::RentalApi,
        )
        .await;

        assert_eq!(result.properties_created, 0);
        assert_eq!(result.properties_skipped, 1);
        assert_eq!(result.units_created, 1);

        let properties = store.list_properties().await.unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].rent_max, Some(1900.0));
        // Still owned by the CSV upload that created it.
        assert_eq!(properties[0].source, ImportSource::CsvUpload);
    }

    #[tokio::test]
    async fn positional_unit_numbers_fill_gaps() {
        let store = MemoryStore::new();
        let records = vec![
            api_record("500 Elm St, Austin, TX", 1, 1.0, 900.0),
            api_record("500 Elm St, Austin, TX", 1, 1.0, 950.0),
        ];

        let result = import(
            &store,
            records,
            ImportPolicy::ReplaceExisting,
            ImportSource::RentalApi,
        )
        .await;

        assert_eq!(result.units_created, 2);
        let mut numbers: Vec<String> = store
            .list_units()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.unit_number)
            .collect();
        numbers.sort();
        assert_eq!(numbers, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn preset_cancel_flag_stops_before_any_work() {
        let store = MemoryStore::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let options = ImportOptions {
            cancel: Some(Arc::clone(&cancel)),
            ..ImportOptions::default()
        };

        let result = run_import(
            &store,
            None,
            vec![api_record("100 Main St, Austin, TX", 2, 1.0, 1500.0)],
            ImportPolicy::ReplaceExisting,
            ImportSource::RentalApi,
            &options,
            &NullProgress,
            ImportResult::new(),
        )
        .await
        .unwrap();

        assert!(!result.success);
        assert_eq!(result.properties_created, 0);
        assert!(store.list_properties().await.unwrap().is_empty());
    }

    struct MapGeocoder {
        hits: HashMap<String, Coordinates>,
    }

    #[async_trait]
    impl Geocoder for MapGeocoder {
        async fn geocode(
            &self,
            street: &str,
            _city: &str,
            _state: &str,
            _zip: Option<&str>,
        ) -> Result<Option<Coordinates>, GeocodeError> {
            Ok(self.hits.get(street).copied())
        }
    }

    #[tokio::test]
    async fn geocode_misses_are_soft_failures() {
        let store = MemoryStore::new();
        let geocoder = MapGeocoder {
            hits: HashMap::from([(
                "100 Main St".to_string(),
                Coordinates {
                    latitude: 30.27,
                    longitude: -97.74,
                },
            )]),
        };

        let records = vec![
            api_record("100 Main St, Austin, TX", 2, 1.0, 1500.0),
            api_record("999 Nowhere Ln, Austin, TX", 1, 1.0, 800.0),
        ];
        let result = run_import(
            &store,
            Some(&geocoder),
            records,
            ImportPolicy::ReplaceExisting,
            ImportSource::RentalApi,
            &ImportOptions::default(),
            &NullProgress,
            ImportResult::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.geocoded, 1);
        assert_eq!(result.geocode_failed, 1);
        assert!(result.errors.is_empty());

        let properties = store.list_properties().await.unwrap();
        let hit = properties
            .iter()
            .find(|p| p.street_address == "100 Main St")
            .unwrap();
        assert_eq!(hit.latitude, Some(30.27));
        let miss = properties
            .iter()
            .find(|p| p.street_address == "999 Nowhere Ln")
            .unwrap();
        assert!(miss.latitude.is_none());
    }

    /// Store wrapper that rejects unit batches for one floor plan ID.
    struct FailingStore {
        inner: MemoryStore,
        reject_plan_suffix: String,
    }

    #[async_trait]
    impl ListingStore for FailingStore {
        async fn list_properties(&self) -> Result<Vec<Property>, StoreError> {
            self.inner.list_properties().await
        }
        async fn list_floor_plans(&self) -> Result<Vec<FloorPlan>, StoreError> {
            self.inner.list_floor_plans().await
        }
        async fn list_units(&self) -> Result<Vec<Unit>, StoreError> {
            self.inner.list_units().await
        }
        async fn insert_property(&self, property: &Property) -> Result<(), StoreError> {
            self.inner.insert_property(property).await
        }
        async fn update_property(&self, property: &Property) -> Result<(), StoreError> {
            self.inner.update_property(property).await
        }
        async fn delete_by_source(&self, source: ImportSource) -> Result<u64, StoreError> {
            self.inner.delete_by_source(source).await
        }
        async fn insert_floor_plan(&self, plan: &FloorPlan) -> Result<(), StoreError> {
            self.inner.insert_floor_plan(plan).await
        }
        async fn insert_units(&self, units: &[Unit]) -> Result<(), StoreError> {
            if units
                .first()
                .is_some_and(|u| u.floor_plan_id.ends_with(&self.reject_plan_suffix))
            {
                return Err(StoreError::Backend {
                    message: "unit batch rejected".to_string(),
                });
            }
            self.inner.insert_units(units).await
        }
    }

    #[tokio::test]
    async fn failed_unit_batch_does_not_sink_siblings() {
        let store = FailingStore {
            inner: MemoryStore::new(),
            // The 2BR/2BA bucket of the first property.
            reject_plan_suffix: ":fp:2-4".to_string(),
        };

        let records = vec![
            api_record("100 Main St Unit 1, Austin, TX", 2, 1.0, 1500.0),
            api_record("100 Main St Unit 2, Austin, TX", 2, 2.0, 1800.0),
            api_record("200 Oak Ave, Austin, TX", 1, 1.0, 900.0),
        ];
        let result = import(
            &store,
            records,
            ImportPolicy::ReplaceExisting,
            ImportSource::RentalApi,
        )
        .await;

        assert_eq!(result.properties_created, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0].context,
            ErrorContext::FloorPlan(_)
        ));
        // The 2BR/1BA sibling and the second property both landed.
        assert_eq!(result.units_created, 2);
        assert_eq!(store.inner.list_units().await.unwrap().len(), 2);
    }
}
