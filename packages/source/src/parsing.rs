//! Shared field parsing for listing source adapters.
//!
//! Strict parsers used by both the API and CSV adapters so that a bad
//! value is rejected the same way regardless of which source produced
//! it.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Strict `YYYY-MM-DD` shape check, applied before calendar validation
/// so that `2024-1-5` or `01/05/2024` are rejected even though chrono
/// could parse variants of them.
static YMD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Parses a strict `YYYY-MM-DD` date. Returns `None` for any other
/// shape or for a non-existent calendar date.
#[must_use]
pub fn parse_date_ymd(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if !YMD_RE.is_match(trimmed) {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

/// Parses a non-negative decimal field (rent, baths). Currency symbols
/// and thousands separators are tolerated since hand-edited CSVs often
/// carry them.
#[must_use]
pub fn parse_f64_field(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace(['$', ','], "");
    let value = cleaned.parse::<f64>().ok()?;
    if value < 0.0 { None } else { Some(value) }
}

/// Parses a non-negative integer field (beds, sqft).
#[must_use]
pub fn parse_u32_field(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok()
}

/// Parses lat/lng from optional f64 fields. Returns `None` if either is
/// missing or zero (sources emit 0/0 for "unknown").
#[must_use]
pub fn parse_lat_lng_f64(lat: Option<f64>, lng: Option<f64>) -> Option<(f64, f64)> {
    let latitude = lat?;
    let longitude = lng?;
    if latitude == 0.0 || longitude == 0.0 {
        return None;
    }
    Some((latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_ymd() {
        let d = parse_date_ymd("2024-06-01").unwrap();
        assert_eq!(d.to_string(), "2024-06-01");
    }

    #[test]
    fn rejects_short_month() {
        assert!(parse_date_ymd("2024-6-1").is_none());
    }

    #[test]
    fn rejects_slash_date() {
        assert!(parse_date_ymd("06/01/2024").is_none());
    }

    #[test]
    fn rejects_impossible_date() {
        assert!(parse_date_ymd("2024-02-31").is_none());
    }

    #[test]
    fn parses_currency_rent() {
        assert!((parse_f64_field("$1,500.50").unwrap() - 1500.50).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_negative_rent() {
        assert!(parse_f64_field("-100").is_none());
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(parse_f64_field("TBD").is_none());
        assert!(parse_u32_field("two").is_none());
    }

    #[test]
    fn rejects_zero_lat_lng() {
        assert!(parse_lat_lng_f64(Some(0.0), Some(-97.74)).is_none());
    }

    #[test]
    fn parses_lat_lng() {
        let (la, lo) = parse_lat_lng_f64(Some(30.2672), Some(-97.7431)).unwrap();
        assert!((la - 30.2672).abs() < f64::EPSILON);
        assert!((lo - -97.7431).abs() < f64::EPSILON);
    }
}
