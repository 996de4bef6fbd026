#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding boundary for the rental listing pipeline.
//!
//! The ingest orchestrator resolves coordinates for new properties that
//! arrive without usable lat/lng. The [`Geocoder`] trait is the narrow
//! seam: one structured lookup per address, at most once per new
//! property, with the caller enforcing an inter-call delay for
//! rate-limited public instances.
//!
//! A `None` result is not an error — the property is still created
//! without coordinates and the miss is counted separately.

pub mod nominatim;

use async_trait::async_trait;
use thiserror::Error;

/// A resolved coordinate pair (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Resolves a street address to coordinates.
///
/// Implementations must be cheap to call sequentially; the orchestrator
/// awaits one lookup at a time and sleeps between calls.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up coordinates for a structured address. Returns
    /// `Ok(None)` when the provider has no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response parsing
    /// fails.
    async fn geocode(
        &self,
        street: &str,
        city: &str,
        state: &str,
        zip: Option<&str>,
    ) -> Result<Option<Coordinates>, GeocodeError>;
}
