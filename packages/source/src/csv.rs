//! CSV upload adapter.
//!
//! Parses hand-uploaded availability files: UTF-8, comma-delimited,
//! double-quote escaping, first row = headers. Tokenization is a
//! single-pass character scanner (quoted fields may contain embedded
//! commas and newlines, and `""` escapes a quote) — a naive
//! split-on-comma cannot handle real exports.
//!
//! Header validation is fatal; each data row is then validated
//! independently so one bad row never aborts the batch.

use rental_sync_models::RawListingRecord;
use std::collections::HashMap;

use crate::SourceError;
use crate::parsing::{parse_date_ymd, parse_f64_field, parse_u32_field};

/// Headers every upload must contain. Missing any of these aborts the
/// whole import with [`SourceError::MissingHeaders`].
pub static REQUIRED_HEADERS: &[&str] = &[
    "property_name",
    "market",
    "floor_plan_name",
    "beds",
    "baths",
    "market_rent",
    "starting_at",
    "unit_number",
    "available_from",
];

/// Recognized optional headers. Anything else passes through
/// unvalidated (uploads carry a long tail of descriptive columns).
pub static OPTIONAL_HEADERS: &[&str] = &["city", "state", "street_address", "sqft", "notes"];

/// Outcome of parsing one uploaded CSV: the valid records plus one
/// `(row, message)` entry per rejected data row (1-based, header
/// excluded).
#[derive(Debug, Default)]
pub struct CsvOutcome {
    /// Records that passed row validation, in file order.
    pub records: Vec<RawListingRecord>,
    /// Rejected rows with the reason each was skipped.
    pub row_errors: Vec<(u64, String)>,
}

/// Tokenizes CSV text into rows of fields with a single-pass scanner.
///
/// Handles quoted fields containing embedded commas and newlines,
/// doubled-quote escaping, and CRLF line endings. Blank lines are
/// skipped.
#[must_use]
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                if row.len() > 1 || !row[0].is_empty() {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }

    // Final row when the file lacks a trailing newline
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        if row.len() > 1 || !row[0].is_empty() {
            rows.push(row);
        }
    }

    rows
}

/// Parses and validates an uploaded CSV into listing records.
///
/// # Errors
///
/// Returns [`SourceError::MissingHeaders`] when any required column is
/// absent and [`SourceError::EmptyCsv`] when no data rows follow the
/// header. Individual invalid rows are collected in
/// [`CsvOutcome::row_errors`], not returned as errors.
pub fn parse_records(text: &str) -> Result<CsvOutcome, SourceError> {
    let rows = parse_csv(text);

    let Some((header_row, data_rows)) = rows.split_first() else {
        return Err(SourceError::EmptyCsv);
    };

    let columns: HashMap<String, usize> = header_row
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();

    let missing: Vec<String> = REQUIRED_HEADERS
        .iter()
        .filter(|h| !columns.contains_key(**h))
        .map(|h| (*h).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SourceError::MissingHeaders { missing });
    }

    if data_rows.is_empty() {
        return Err(SourceError::EmptyCsv);
    }

    let mut outcome = CsvOutcome::default();
    for (i, row) in data_rows.iter().enumerate() {
        let row_num = i as u64 + 1;
        match row_to_record(&columns, row) {
            Ok(record) => outcome.records.push(record),
            Err(message) => {
                log::warn!("CSV row {row_num} rejected: {message}");
                outcome.row_errors.push((row_num, message));
            }
        }
    }

    log::info!(
        "CSV parsed: {} valid rows, {} rejected",
        outcome.records.len(),
        outcome.row_errors.len()
    );

    Ok(outcome)
}

/// Validates one data row and maps it to a [`RawListingRecord`].
fn row_to_record(
    columns: &HashMap<String, usize>,
    row: &[String],
) -> Result<RawListingRecord, String> {
    let field = |name: &str| -> Option<&str> {
        columns
            .get(name)
            .and_then(|&i| row.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    };

    for required in REQUIRED_HEADERS {
        if field(required).is_none() {
            return Err(format!("missing required field `{required}`"));
        }
    }

    let numeric_u32 = |name: &str| -> Result<Option<u32>, String> {
        field(name).map_or(Ok(None), |raw| {
            parse_u32_field(raw)
                .map(Some)
                .ok_or_else(|| format!("invalid numeric value for `{name}`: '{raw}'"))
        })
    };
    let numeric_f64 = |name: &str| -> Result<Option<f64>, String> {
        field(name).map_or(Ok(None), |raw| {
            parse_f64_field(raw)
                .map(Some)
                .ok_or_else(|| format!("invalid numeric value for `{name}`: '{raw}'"))
        })
    };

    let beds = numeric_u32("beds")?;
    let sqft = numeric_u32("sqft")?;
    let baths = numeric_f64("baths")?;
    let market_rent = numeric_f64("market_rent")?;
    let starting_at = numeric_f64("starting_at")?;

    // Required, so the unwraps above already guaranteed presence
    let available_raw = field("available_from").unwrap_or_default();
    let available_from = parse_date_ymd(available_raw).ok_or_else(|| {
        format!("invalid date for `available_from`: '{available_raw}' (expected YYYY-MM-DD)")
    })?;

    let market = field("market").unwrap_or_default().to_string();
    let city = field("city").map_or_else(|| market.clone(), String::from);

    Ok(RawListingRecord {
        source_listing_id: None,
        address: field("street_address").unwrap_or_default().to_string(),
        address_line2: None,
        city,
        state: field("state").unwrap_or_default().to_string(),
        zip: None,
        beds,
        baths,
        sqft,
        price: market_rent,
        starting_at,
        status: None,
        listed_date: None,
        description: field("notes").map(String::from),
        photos: Vec::new(),
        property_name: field("property_name").map(String::from),
        floor_plan_name: field("floor_plan_name").map(String::from),
        unit_number: field("unit_number").map(String::from),
        available_from: Some(available_from),
        latitude: None,
        longitude: None,
        extracted_unit: None,
    })
}

/// Returns the downloadable upload template: header row plus two
/// fully-populated example rows and one minimal required-fields-only
/// row.
#[must_use]
pub fn template() -> String {
    let mut out = String::new();
    out.push_str(
        "property_name,market,city,state,street_address,floor_plan_name,beds,baths,sqft,market_rent,starting_at,unit_number,available_from,notes\n",
    );
    out.push_str(
        "The Arbor Lofts,Austin,Austin,TX,1200 W 5th St,Arbor 2x2,2,2,1050,2195,2050,204,2025-07-01,\"Corner unit, faces courtyard\"\n",
    );
    out.push_str(
        "The Arbor Lofts,Austin,Austin,TX,1200 W 5th St,Arbor 1x1,1,1,680,1595,1495,118,2025-07-15,\n",
    );
    out.push_str("Sunset Flats,Dallas,,,,1BR Classic,1,1,,1450,1395,12B,2025-08-01,\n");
    out
}
