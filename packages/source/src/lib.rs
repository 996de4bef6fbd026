#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Listing source adapters.
//!
//! Two structurally parallel adapters produce flat
//! [`rental_sync_models::RawListingRecord`] lists for the ingest
//! pipeline:
//!
//! - [`api`] — paginates an external rental listings endpoint with an
//!   offset/limit cursor and a hard safety cap.
//! - [`csv`] — tokenizes a hand-uploaded availability CSV with a
//!   single-pass quote-aware scanner and validates rows independently.

pub mod api;
pub mod csv;
pub mod parsing;
pub mod progress;

/// Errors that can occur while fetching or parsing listing data.
///
/// Every variant here is fatal to the import run; row-level CSV
/// validation failures are collected per row instead (see
/// [`csv::parse_records`]).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The listings API returned zero records for the query.
    #[error("No listings returned for {city}, {state}")]
    NoListings {
        /// Queried city.
        city: String,
        /// Queried state.
        state: String,
    },

    /// The uploaded CSV is missing required header columns.
    #[error("CSV is missing required columns: {}", missing.join(", "))]
    MissingHeaders {
        /// The absent required headers.
        missing: Vec<String>,
    },

    /// The uploaded CSV has a header row but no data rows.
    #[error("CSV contains no data rows")]
    EmptyCsv,
}

/// Options shared by the source adapters' fetch operations.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Stop after accumulating this many records (testing aid; the
    /// adapters also enforce their own safety caps).
    pub limit: Option<u64>,
    /// Delay between page fetches in milliseconds.
    pub page_delay_ms: Option<u64>,
}
