//! Partitions a flat list of raw listings into per-property groups.
//!
//! The grouping key is the normalized full address. Records whose address
//! normalizes to an empty string fall back to the raw address, then to the
//! property name, so sparse CSV rows still land in a stable bucket.

use rental_sync_address::{extract_unit, normalize_address};
use rental_sync_models::RawListingRecord;
use std::collections::HashMap;

/// All raw records that resolved to the same property key, in the order
/// they appeared in the source.
#[derive(Debug)]
pub struct PropertyGroup {
    pub key: String,
    pub records: Vec<RawListingRecord>,
}

fn group_key(record: &RawListingRecord) -> String {
    let normalized = normalize_address(&record.address);
    if !normalized.is_empty() {
        return normalized;
    }
    let raw = record.address.trim();
    if !raw.is_empty() {
        return raw.to_string();
    }
    record
        .property_name
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Groups records by property, preserving first-seen order of both groups
/// and the records within each group.
///
/// Each record is annotated with its extracted unit designator before
/// grouping, since the designator is stripped from the grouping key.
/// Records with no usable key at all are logged and dropped.
#[must_use]
pub fn group_records(records: Vec<RawListingRecord>) -> Vec<PropertyGroup> {
    let mut groups: Vec<PropertyGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut record in records {
        record.extracted_unit = extract_unit(&record);

        let key = group_key(&record);
        if key.is_empty() {
            log::warn!("Dropping listing with no address or property name");
            continue;
        }

        if let Some(&slot) = index.get(&key) {
            groups[slot].records.push(record);
        } else {
            index.insert(key.clone(), groups.len());
            groups.push(PropertyGroup {
                key,
                records: vec![record],
            });
        }
    }

    groups
}
