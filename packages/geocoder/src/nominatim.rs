//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance enforces strict rate limits (1 request per
//! second); the ingest orchestrator sleeps between calls, so this
//! client performs no throttling of its own.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;
use std::time::Duration;

use crate::{Coordinates, GeocodeError, Geocoder};

/// Default public Nominatim endpoint.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/search";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Geocoder backed by a Nominatim structured search endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Creates a client for the given Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("rental-sync/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(
        &self,
        street: &str,
        city: &str,
        state: &str,
        zip: Option<&str>,
    ) -> Result<Option<Coordinates>, GeocodeError> {
        let mut params = vec![
            ("street", street.to_string()),
            ("city", city.to_string()),
            ("state", state.to_string()),
            ("countrycodes", "us".to_string()),
            ("format", "jsonv2".to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(zip) = zip {
            params.push(("postalcode", zip.to_string()));
        }

        let resp = self.client.get(&self.base_url).query(&params).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.json().await?;
        let result = parse_response(&body)?;
        if result.is_none() {
            log::debug!("Nominatim: no match for '{street}, {city}, {state}'");
        }
        Ok(result)
    }
}

/// Parses a Nominatim JSON response into coordinates.
fn parse_response(body: &serde_json::Value) -> Result<Option<Coordinates>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let latitude = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let longitude = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(Some(Coordinates {
        latitude,
        longitude,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "30.2672",
            "lon": "-97.7431",
            "display_name": "100, Main Street, Austin, TX, USA"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 30.2672).abs() < 1e-4);
        assert!((result.longitude - -97.7431).abs() < 1e-4);
    }

    #[test]
    fn empty_result_is_a_miss_not_an_error() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn non_array_body_is_parse_error() {
        let body = serde_json::json!({ "error": "unavailable" });
        assert!(parse_response(&body).is_err());
    }
}
