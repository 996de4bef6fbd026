#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data model for the rental listing ingestion pipeline.
//!
//! Source adapters (listings API, CSV upload) produce flat
//! [`RawListingRecord`]s. The ingest pipeline groups them by normalized
//! street address and persists the resulting
//! [`Property`] → [`FloorPlan`] → [`Unit`] hierarchy, reporting
//! counts and per-item failures through [`ImportResult`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which import source created (and therefore owns) a property.
///
/// Used to scope the API sync's "replace existing" delete so it only
/// ever removes records it created itself.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportSource {
    /// Paginated external rental listings API.
    RentalApi,
    /// Hand-uploaded CSV availability file.
    CsvUpload,
}

/// One raw per-unit listing row from either source adapter.
///
/// Ephemeral: lives only for the duration of one import run. The
/// `extracted_unit` annotation is filled in by the grouping engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListingRecord {
    /// Listing ID assigned by the source, if any.
    pub source_listing_id: Option<String>,
    /// Primary street address line (may still contain a unit designator).
    pub address: String,
    /// Secondary address line (e.g., "Unit 4B"), if provided.
    pub address_line2: Option<String>,
    /// City name.
    pub city: String,
    /// Two-letter state abbreviation.
    pub state: String,
    /// ZIP code, if available.
    pub zip: Option<String>,
    /// Bedroom count. `None` when the source omits it.
    pub beds: Option<u32>,
    /// Bathroom count (half baths allowed).
    pub baths: Option<f64>,
    /// Square footage.
    pub sqft: Option<u32>,
    /// Asking rent for this unit.
    pub price: Option<f64>,
    /// "Starting at" rent, when the source distinguishes it from the
    /// market rent (CSV uploads do).
    pub starting_at: Option<f64>,
    /// Listing status from the source (e.g., "Active").
    pub status: Option<String>,
    /// Date the listing was posted.
    pub listed_date: Option<NaiveDate>,
    /// Free-text description.
    pub description: Option<String>,
    /// Photo URLs.
    pub photos: Vec<String>,
    /// Display name of the property/community, if the source knows it.
    pub property_name: Option<String>,
    /// Floor plan name, when the source provides one (CSV uploads do).
    pub floor_plan_name: Option<String>,
    /// Explicit unit number, when the source provides one.
    pub unit_number: Option<String>,
    /// Date the unit becomes available.
    pub available_from: Option<NaiveDate>,
    /// Latitude supplied by the source, if any.
    pub latitude: Option<f64>,
    /// Longitude supplied by the source, if any.
    pub longitude: Option<f64>,
    /// Unit number extracted from the address by the grouping engine.
    /// Transient; never persisted.
    #[serde(skip)]
    pub extracted_unit: Option<String>,
}

/// A persisted property: one street address / apartment community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Deterministic ID derived from the normalized address.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Street address with unit designators stripped.
    pub street_address: String,
    /// City name.
    pub city: String,
    /// Two-letter state abbreviation.
    pub state: String,
    /// ZIP code, if known.
    pub zip: Option<String>,
    /// Latitude (WGS84). `None` when neither the source nor the
    /// geocoder produced coordinates.
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Lowest positive rent across the property's units.
    pub rent_min: Option<f64>,
    /// Highest positive rent across the property's units.
    pub rent_max: Option<f64>,
    /// Fewest bedrooms across units.
    pub beds_min: Option<u32>,
    /// Most bedrooms across units.
    pub beds_max: Option<u32>,
    /// Fewest bathrooms across units.
    pub baths_min: Option<f64>,
    /// Most bathrooms across units.
    pub baths_max: Option<f64>,
    /// Smallest unit square footage.
    pub sqft_min: Option<u32>,
    /// Largest unit square footage.
    pub sqft_max: Option<u32>,
    /// De-duplicated photo URLs, capped at `PHOTO_CAP`.
    pub photos: Vec<String>,
    /// Which import source owns this property.
    pub source: ImportSource,
    /// When this property was first created.
    pub created_at: DateTime<Utc>,
    /// When this property was last updated by an import.
    pub updated_at: DateTime<Utc>,
}

/// A persisted floor plan: one (beds, baths) configuration within a
/// property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlan {
    /// Deterministic ID derived from the parent property ID and the
    /// (beds, baths) key.
    pub id: String,
    /// Parent property ID.
    pub property_id: String,
    /// Derived display name (e.g., "2BR/2BA").
    pub name: String,
    /// Bedroom count.
    pub beds: u32,
    /// Bathroom count.
    pub baths: f64,
    /// Largest square footage seen among the plan's units.
    pub sqft: Option<u32>,
    /// Highest positive rent seen among the plan's units.
    pub market_rent: Option<f64>,
    /// Lowest positive rent seen among the plan's units.
    pub starting_at: Option<f64>,
}

/// A persisted rentable unit within a floor plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Deterministic ID derived from the parent property ID and the
    /// unit number.
    pub id: String,
    /// Parent property ID.
    pub property_id: String,
    /// Parent floor plan ID.
    pub floor_plan_id: String,
    /// Unit number, unique within the property (extracted from the
    /// address or synthesized from the record's position).
    pub unit_number: String,
    /// Asking rent.
    pub rent: Option<f64>,
    /// Date the unit becomes available.
    pub available_from: Option<NaiveDate>,
    /// Whether the unit is actively listed.
    pub available: bool,
    /// Listing status from the source.
    pub status: Option<String>,
    /// Free-text notes carried from the source description.
    pub notes: Option<String>,
}

/// Where in the pipeline an import error occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorContext {
    /// A CSV data row (1-based, excluding the header row).
    Row(u64),
    /// A property group, identified by display name or address.
    Property(String),
    /// A floor plan within a property, identified by "{property}/{plan}".
    FloorPlan(String),
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Row(n) => write!(f, "row {n}"),
            Self::Property(name) => write!(f, "property '{name}'"),
            Self::FloorPlan(name) => write!(f, "floor plan '{name}'"),
        }
    }
}

/// One recorded, non-fatal import failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    /// What failed.
    pub context: ErrorContext,
    /// Why it failed.
    pub message: String,
}

/// How the dedup resolver treats properties that already exist in the
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Leave matching existing properties untouched and only add units
    /// the store has not seen. Used by the CSV upload path so manually
    /// curated properties are never clobbered.
    SkipExisting,
    /// Refresh matching existing properties' aggregates. The API sync
    /// path uses this after deleting its own prior records (a full
    /// "replace, don't merge" resync).
    ReplaceExisting,
}

/// Summary of one import run. Returned to the caller; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// `false` only when the run was cancelled partway through. Fatal
    /// errors surface as an `Err` from the import call instead.
    pub success: bool,
    /// Properties created this run.
    pub properties_created: u64,
    /// Property groups that matched an existing property.
    pub properties_skipped: u64,
    /// Floor plans created this run.
    pub floor_plans_created: u64,
    /// Units created this run.
    pub units_created: u64,
    /// Units skipped as duplicates of stored units.
    pub units_skipped: u64,
    /// Successful geocode lookups.
    pub geocoded: u64,
    /// Geocode lookups that returned no match or failed. Soft: these
    /// never appear in `errors`.
    pub geocode_failed: u64,
    /// Per-row / per-group / per-floor-plan failures.
    pub errors: Vec<ImportError>,
}

impl ImportResult {
    /// Creates an empty, successful result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            success: true,
            properties_created: 0,
            properties_skipped: 0,
            floor_plans_created: 0,
            units_created: 0,
            units_skipped: 0,
            geocoded: 0,
            geocode_failed: 0,
            errors: Vec::new(),
        }
    }
}

impl Default for ImportResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_source_round_trips_screaming_snake() {
        assert_eq!(ImportSource::RentalApi.to_string(), "RENTAL_API");
        assert_eq!(
            "CSV_UPLOAD".parse::<ImportSource>().unwrap(),
            ImportSource::CsvUpload
        );
    }

    #[test]
    fn error_context_display() {
        assert_eq!(ErrorContext::Row(3).to_string(), "row 3");
        assert_eq!(
            ErrorContext::Property("Main St Flats".to_string()).to_string(),
            "property 'Main St Flats'"
        );
    }

    #[test]
    fn new_result_is_successful_and_empty() {
        let result = ImportResult::new();
        assert!(result.success);
        assert_eq!(result.properties_created, 0);
        assert!(result.errors.is_empty());
    }
}
