//! Paginated rental listings API adapter.
//!
//! Walks the external listings endpoint with an `offset`/`limit` page
//! cursor, accumulating per-unit records until a short page, an empty
//! page, or the safety cap. The response body is accepted either as
//! `{ "listings": [...] }` or as a bare array.

use rental_sync_models::RawListingRecord;
use serde_json::Value;
use std::time::Duration;

use crate::parsing::parse_date_ymd;
use crate::progress::ProgressCallback;
use crate::{FetchOptions, SourceError};

/// Records requested per page. 500 is the highest page size the
/// listings API accepts.
pub const PAGE_SIZE: u64 = 500;

/// Hard cap on records accumulated in one run, so a misbehaving
/// endpoint can never paginate forever.
pub const MAX_TOTAL_LISTINGS: u64 = 2000;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Location and property-type filter for a listings query.
#[derive(Debug, Clone)]
pub struct ListingsQuery {
    /// City to search in.
    pub city: String,
    /// Two-letter state abbreviation.
    pub state: String,
    /// Listing status filter. Defaults to `"Active"`.
    pub status: String,
    /// Property type filter (e.g., "Apartment"), if any.
    pub property_type: Option<String>,
}

impl ListingsQuery {
    /// Creates a query for active listings in the given location.
    #[must_use]
    pub fn new(city: &str, state: &str) -> Self {
        Self {
            city: city.to_string(),
            state: state.to_string(),
            status: "Active".to_string(),
            property_type: None,
        }
    }

    /// Restricts the query to one property type.
    #[must_use]
    pub fn with_property_type(mut self, property_type: &str) -> Self {
        self.property_type = Some(property_type.to_string());
        self
    }
}

/// HTTP client for the external rental listings API.
pub struct ListingsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ListingsApiClient {
    /// Creates a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.map(String::from),
        })
    }

    /// Fetches every page of listings matching `query`.
    ///
    /// Stops when a page returns fewer than [`PAGE_SIZE`] records, when
    /// the cumulative total reaches [`MAX_TOTAL_LISTINGS`], or when the
    /// optional `options.limit` is hit. Progress is reported after
    /// every page.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if any page fetch fails (the first
    /// failure aborts the whole fetch) and [`SourceError::NoListings`]
    /// if the run yields zero records.
    pub async fn fetch_all(
        &self,
        query: &ListingsQuery,
        options: &FetchOptions,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<RawListingRecord>, SourceError> {
        progress.report("Connecting to listings API", 0, 0);

        let mut records: Vec<RawListingRecord> = Vec::new();
        let mut offset: u64 = 0;
        let mut page_num: u64 = 0;

        loop {
            page_num += 1;
            let page = self.fetch_page(query, offset).await?;
            let count = page.len() as u64;

            records.extend(page.iter().filter_map(record_from_json));
            offset += count;

            log::info!(
                "[{}, {}] Page {page_num}: {count} listings (total: {})",
                query.city,
                query.state,
                records.len()
            );
            progress.report(
                &format!("Fetched {} listings", records.len()),
                records.len() as u64,
                0,
            );

            if count < PAGE_SIZE {
                break;
            }

            if offset >= MAX_TOTAL_LISTINGS {
                log::warn!(
                    "[{}, {}] Hit safety cap of {MAX_TOTAL_LISTINGS} listings, stopping",
                    query.city,
                    query.state
                );
                break;
            }

            if let Some(limit) = options.limit
                && records.len() as u64 >= limit
            {
                log::info!("[{}, {}] Reached limit of {limit} records", query.city, query.state);
                break;
            }

            if let Some(ms) = options.page_delay_ms
                && ms > 0
            {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
        }

        if records.is_empty() {
            return Err(SourceError::NoListings {
                city: query.city.clone(),
                state: query.state.clone(),
            });
        }

        Ok(records)
    }

    async fn fetch_page(
        &self,
        query: &ListingsQuery,
        offset: u64,
    ) -> Result<Vec<Value>, SourceError> {
        let mut params: Vec<(&str, String)> = vec![
            ("city", query.city.clone()),
            ("state", query.state.clone()),
            ("status", query.status.clone()),
            ("limit", PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(property_type) = &query.property_type {
            params.push(("propertyType", property_type.clone()));
        }

        let mut request = self.client.get(&self.base_url).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let resp = request.send().await?.error_for_status()?;
        let body: Value = resp.json().await?;
        Ok(extract_listings(&body))
    }
}

/// Extracts the listing array from a response body that is either
/// `{ "listings": [...] }` or a bare array.
#[must_use]
pub fn extract_listings(body: &Value) -> Vec<Value> {
    if let Some(array) = body.as_array() {
        return array.clone();
    }
    body.get("listings")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Maps one API listing object to a [`RawListingRecord`].
///
/// Returns `None` when the listing carries no usable address — such
/// records cannot be grouped and are dropped with a log line.
#[must_use]
pub fn record_from_json(listing: &Value) -> Option<RawListingRecord> {
    let address = string_field(listing, "addressLine1")
        .or_else(|| string_field(listing, "formattedAddress"));

    let Some(address) = address else {
        log::debug!("Skipping listing without an address: {listing}");
        return None;
    };

    let photos = listing
        .get("photos")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(RawListingRecord {
        source_listing_id: id_field(listing),
        address,
        address_line2: string_field(listing, "addressLine2"),
        city: string_field(listing, "city").unwrap_or_default(),
        state: string_field(listing, "state").unwrap_or_default(),
        zip: string_field(listing, "zipCode"),
        beds: u32_field(listing, "bedrooms"),
        baths: listing.get("bathrooms").and_then(Value::as_f64),
        sqft: u32_field(listing, "squareFootage"),
        price: listing.get("price").and_then(Value::as_f64),
        starting_at: None,
        status: string_field(listing, "status"),
        listed_date: string_field(listing, "listedDate")
            .and_then(|s| parse_date_ymd(s.get(..10).unwrap_or(&s))),
        description: string_field(listing, "description"),
        photos,
        property_name: string_field(listing, "propertyName"),
        floor_plan_name: None,
        unit_number: None,
        available_from: None,
        latitude: listing.get("latitude").and_then(Value::as_f64),
        longitude: listing.get("longitude").and_then(Value::as_f64),
        extracted_unit: None,
    })
}

/// Returns a trimmed, non-empty string field.
fn string_field(listing: &Value, key: &str) -> Option<String> {
    let s = listing.get(key)?.as_str()?.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// The source `id` may be a string or a number.
fn id_field(listing: &Value) -> Option<String> {
    match listing.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Beds/sqft arrive as integers from some deployments and floats from
/// others.
fn u32_field(listing: &Value, key: &str) -> Option<u32> {
    let value = listing.get(key)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    value
        .as_f64()
        .filter(|f| *f >= 0.0)
        .map(|f| f.trunc() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_wrapped_listings() {
        let body = json!({ "listings": [{ "id": 1 }, { "id": 2 }] });
        assert_eq!(extract_listings(&body).len(), 2);
    }

    #[test]
    fn extracts_bare_array() {
        let body = json!([{ "id": 1 }]);
        assert_eq!(extract_listings(&body).len(), 1);
    }

    #[test]
    fn empty_for_unexpected_shape() {
        let body = json!({ "results": [] });
        assert!(extract_listings(&body).is_empty());
    }

    #[test]
    fn maps_full_listing() {
        let listing = json!({
            "id": "lst-1",
            "addressLine1": "100 Main St Unit 4",
            "addressLine2": "Unit 4",
            "city": "Austin",
            "state": "TX",
            "zipCode": "78701",
            "bedrooms": 2,
            "bathrooms": 1.5,
            "squareFootage": 850,
            "price": 1500.0,
            "status": "Active",
            "listedDate": "2024-05-01T00:00:00Z",
            "propertyName": "Main St Flats",
            "photos": ["https://img.example/1.jpg"],
            "latitude": 30.2672,
            "longitude": -97.7431
        });

        let record = record_from_json(&listing).unwrap();
        assert_eq!(record.address, "100 Main St Unit 4");
        assert_eq!(record.beds, Some(2));
        assert!((record.baths.unwrap() - 1.5).abs() < f64::EPSILON);
        assert_eq!(record.sqft, Some(850));
        assert_eq!(record.listed_date.unwrap().to_string(), "2024-05-01");
        assert_eq!(record.photos.len(), 1);
        assert_eq!(record.source_listing_id, Some("lst-1".to_string()));
    }

    #[test]
    fn falls_back_to_formatted_address() {
        let listing = json!({ "formattedAddress": "9 Elm St, Boston, MA" });
        let record = record_from_json(&listing).unwrap();
        assert_eq!(record.address, "9 Elm St, Boston, MA");
    }

    #[test]
    fn drops_listing_without_address() {
        let listing = json!({ "city": "Austin", "price": 1200 });
        assert!(record_from_json(&listing).is_none());
    }

    #[test]
    fn numeric_id_becomes_string() {
        let listing = json!({ "addressLine1": "1 A St", "id": 42 });
        let record = record_from_json(&listing).unwrap();
        assert_eq!(record.source_listing_id, Some("42".to_string()));
    }

    #[test]
    fn float_bedrooms_truncate() {
        let listing = json!({ "addressLine1": "1 A St", "bedrooms": 2.0 });
        assert_eq!(record_from_json(&listing).unwrap().beds, Some(2));
    }
}
