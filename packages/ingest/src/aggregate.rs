//! Rolls a property group's records up into property-level ranges and
//! floor plan buckets.

use crate::grouping::PropertyGroup;
use rental_sync_address::display_street;
use rental_sync_models::RawListingRecord;
use rental_sync_source::parsing::parse_lat_lng_f64;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Photos kept per property, after de-duplication.
pub const PHOTO_CAP: usize = 10;

/// Property-level rollup of a group's records.
///
/// Ranges only consider positive values; a record with a zero or missing
/// rent never drags a range down to zero.
#[derive(Debug, Default)]
pub struct PropertyAggregate {
    pub display_address: String,
    pub rent_min: Option<f64>,
    pub rent_max: Option<f64>,
    pub beds_min: Option<u32>,
    pub beds_max: Option<u32>,
    pub baths_min: Option<f64>,
    pub baths_max: Option<f64>,
    pub sqft_min: Option<u32>,
    pub sqft_max: Option<u32>,
    pub photos: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn widen_f64(min: &mut Option<f64>, max: &mut Option<f64>, value: f64) {
    if value <= 0.0 {
        return;
    }
    *min = Some(min.map_or(value, |m| m.min(value)));
    *max = Some(max.map_or(value, |m| m.max(value)));
}

fn widen_u32(min: &mut Option<u32>, max: &mut Option<u32>, value: u32) {
    if value == 0 {
        return;
    }
    *min = Some(min.map_or(value, |m| m.min(value)));
    *max = Some(max.map_or(value, |m| m.max(value)));
}

/// Aggregates property-level fields across all records in a group.
#[must_use]
pub fn aggregate_group(group: &PropertyGroup) -> PropertyAggregate {
    let mut agg = PropertyAggregate {
        display_address: group
            .records
            .first()
            .map(|record| display_street(&record.address))
            .filter(|street| !street.is_empty())
            .unwrap_or_else(|| group.key.clone()),
        ..PropertyAggregate::default()
    };

    let mut seen_photos = HashSet::new();
    for record in &group.records {
        if let Some(price) = record.price {
            widen_f64(&mut agg.rent_min, &mut agg.rent_max, price);
        }
        if let Some(starting_at) = record.starting_at {
            widen_f64(&mut agg.rent_min, &mut agg.rent_max, starting_at);
        }
        if let Some(beds) = record.beds {
            widen_u32(&mut agg.beds_min, &mut agg.beds_max, beds);
        }
        if let Some(baths) = record.baths {
            widen_f64(&mut agg.baths_min, &mut agg.baths_max, baths);
        }
        if let Some(sqft) = record.sqft {
            widen_u32(&mut agg.sqft_min, &mut agg.sqft_max, sqft);
        }

        if agg.latitude.is_none()
            && let Some((lat, lng)) = parse_lat_lng_f64(record.latitude, record.longitude)
        {
            agg.latitude = Some(lat);
            agg.longitude = Some(lng);
        }

        for photo in &record.photos {
            if agg.photos.len() >= PHOTO_CAP {
                break;
            }
            if seen_photos.insert(photo.clone()) {
                agg.photos.push(photo.clone());
            }
        }
    }

    agg
}

/// Floor plan bucket key: bed count plus bath count doubled, so half
/// baths compare exactly.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FloorPlanKey {
    pub beds: u32,
    pub baths_x2: u32,
}

impl FloorPlanKey {
    /// Missing beds bucket as studios (0), missing baths as a single bath.
    #[must_use]
    pub fn from_record(record: &RawListingRecord) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let baths_x2 = (record.baths.unwrap_or(1.0).max(0.0) * 2.0).round() as u32;
        Self {
            beds: record.beds.unwrap_or_default(),
            baths_x2,
        }
    }

    #[must_use]
    pub fn baths(&self) -> f64 {
        f64::from(self.baths_x2) / 2.0
    }
}

impl fmt::Display for FloorPlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.baths_x2 % 2 == 0 {
            write!(f, "{}BR/{}BA", self.beds, self.baths_x2 / 2)
        } else {
            write!(f, "{}BR/{}BA", self.beds, self.baths())
        }
    }
}

/// One floor plan bucket: its pricing rollup and the indices of the
/// member records within the owning group.
#[derive(Debug)]
pub struct FloorPlanGroup {
    pub key: FloorPlanKey,
    pub name: String,
    pub sqft: Option<u32>,
    pub market_rent: Option<f64>,
    pub starting_at: Option<f64>,
    pub members: Vec<usize>,
}

/// Buckets a group's records by (beds, baths) in first-seen order.
///
/// Within a bucket the market rent is the highest positive price seen and
/// the starting-at price is the lowest; square footage takes the max.
#[must_use]
pub fn partition_floor_plans(group: &PropertyGroup) -> Vec<FloorPlanGroup> {
    let mut plans: Vec<FloorPlanGroup> = Vec::new();
    let mut index: HashMap<FloorPlanKey, usize> = HashMap::new();

    for (position, record) in group.records.iter().enumerate() {
        let key = FloorPlanKey::from_record(record);
        let slot = *index.entry(key).or_insert_with(|| {
            plans.push(FloorPlanGroup {
                key,
                name: record
                    .floor_plan_name
                    .clone()
                    .unwrap_or_else(|| key.to_string()),
                sqft: None,
                market_rent: None,
                starting_at: None,
                members: Vec::new(),
            });
            plans.len() - 1
        });

        let plan = &mut plans[slot];
        plan.members.push(position);
        if let Some(sqft) = record.sqft.filter(|&s| s > 0) {
            plan.sqft = Some(plan.sqft.map_or(sqft, |m| m.max(sqft)));
        }
        if let Some(price) = record.price.filter(|&p| p > 0.0) {
            plan.market_rent = Some(plan.market_rent.map_or(price, |m| m.max(price)));
            plan.starting_at = Some(plan.starting_at.map_or(price, |m| m.min(price)));
        }
        if let Some(starting) = record.starting_at.filter(|&p| p > 0.0) {
            plan.starting_at = Some(plan.starting_at.map_or(starting, |m| m.min(starting)));
        }
    }

    plans
}

/// A unit is leasable when its status is active or it has an upcoming
/// availability date.
#[must_use]
pub fn unit_available(record: &RawListingRecord) -> bool {
    record
        .status
        .as_deref()
        .is_some_and(|status| status.eq_ignore_ascii_case("active"))
        || record.available_from.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(beds: Option<u32>, baths: Option<f64>, price: Option<f64>) -> RawListingRecord {
        RawListingRecord {
            address: "100 Main St, Austin, TX".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            beds,
            baths,
            price,
            ..RawListingRecord::default()
        }
    }

    fn group_of(records: Vec<RawListingRecord>) -> PropertyGroup {
        PropertyGroup {
            key: "100 Main St, Austin, TX".to_string(),
            records,
        }
    }

    #[test]
    fn rent_range_ignores_non_positive_values() {
        let group = group_of(vec![
            record(Some(2), Some(1.0), Some(1200.0)),
            record(Some(2), Some(1.0), Some(0.0)),
            record(Some(2), Some(1.0), Some(1500.0)),
            record(Some(2), Some(1.0), None),
        ]);

        let agg = aggregate_group(&group);

        assert_eq!(agg.rent_min, Some(1200.0));
        assert_eq!(agg.rent_max, Some(1500.0));
    }

    #[test]
    fn display_address_is_street_portion_of_first_record() {
        let group = group_of(vec![record(Some(1), Some(1.0), Some(900.0))]);

        let agg = aggregate_group(&group);

        assert_eq!(agg.display_address, "100 Main St");
    }

    #[test]
    fn photos_deduped_and_capped() {
        let mut first = record(Some(1), Some(1.0), Some(900.0));
        first.photos = (0..8).map(|i| format!("https://p.example/{i}.jpg")).collect();
        let mut second = record(Some(1), Some(1.0), Some(950.0));
        second.photos = (4..16)
            .map(|i| format!("https://p.example/{i}.jpg"))
            .collect();

        let agg = aggregate_group(&group_of(vec![first, second]));

        assert_eq!(agg.photos.len(), PHOTO_CAP);
        assert_eq!(agg.photos[0], "https://p.example/0.jpg");
        assert_eq!(agg.photos[9], "https://p.example/9.jpg");
    }

    #[test]
    fn coordinates_come_from_first_usable_record() {
        let mut first = record(Some(1), Some(1.0), Some(900.0));
        first.latitude = Some(0.0);
        first.longitude = Some(0.0);
        let mut second = record(Some(1), Some(1.0), Some(950.0));
        second.latitude = Some(30.27);
        second.longitude = Some(-97.74);

        let agg = aggregate_group(&group_of(vec![first, second]));

        assert_eq!(agg.latitude, Some(30.27));
        assert_eq!(agg.longitude, Some(-97.74));
    }

    #[test]
    fn partition_buckets_by_beds_and_baths() {
        let group = group_of(vec![
            record(Some(2), Some(1.0), Some(1500.0)),
            record(Some(2), Some(1.0), Some(1600.0)),
            record(Some(2), Some(2.0), Some(1800.0)),
        ]);

        let plans = partition_floor_plans(&group);

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].members, vec![0, 1]);
        assert_eq!(plans[0].starting_at, Some(1500.0));
        assert_eq!(plans[0].market_rent, Some(1600.0));
        assert_eq!(plans[1].members, vec![2]);
    }

    #[test]
    fn floor_plan_key_displays_half_baths() {
        let key = FloorPlanKey::from_record(&record(Some(2), Some(1.5), None));
        assert_eq!(key.to_string(), "2BR/1.5BA");

        let whole = FloorPlanKey::from_record(&record(Some(3), Some(2.0), None));
        assert_eq!(whole.to_string(), "3BR/2BA");
    }

    #[test]
    fn missing_beds_and_baths_default_to_studio_one_bath() {
        let key = FloorPlanKey::from_record(&record(None, None, None));
        assert_eq!(key.beds, 0);
        assert_eq!(key.baths_x2, 2);
        assert_eq!(key.to_string(), "0BR/1BA");
    }

    #[test]
    fn availability_follows_status_or_date() {
        let mut active = record(Some(1), Some(1.0), None);
        active.status = Some("Active".to_string());
        assert!(unit_available(&active));

        let mut dated = record(Some(1), Some(1.0), None);
        dated.available_from = chrono::NaiveDate::from_ymd_opt(2025, 10, 1);
        assert!(unit_available(&dated));

        let idle = record(Some(1), Some(1.0), None);
        assert!(!unit_available(&idle));
    }
}
