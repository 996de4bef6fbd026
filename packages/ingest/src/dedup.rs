//! In-memory index of stored properties and units, used to resolve
//! incoming property groups against what already exists.
//!
//! Loaded once per import run and kept current as the run creates
//! records, so a single pass never double-inserts.

use rental_sync_models::{Property, Unit};
use rental_sync_store::{ListingStore, StoreError};
use std::collections::{HashMap, HashSet};

fn match_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Lookup index over the store's current properties and units.
pub struct ExistingIndex {
    by_name: HashMap<String, Property>,
    by_street_city: HashMap<(String, String), Property>,
    units: HashSet<(String, String)>,
}

impl ExistingIndex {
    /// Builds the index from the store's current contents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if listing properties or units fails.
    pub async fn load(store: &dyn ListingStore) -> Result<Self, StoreError> {
        let mut index = Self {
            by_name: HashMap::new(),
            by_street_city: HashMap::new(),
            units: HashSet::new(),
        };
        for property in store.list_properties().await? {
            index.register_property(&property);
        }
        for unit in store.list_units().await? {
            index.register_unit(&unit.property_id, &unit.unit_number);
        }
        Ok(index)
    }

    /// Finds an existing property for an incoming group. Name matches
    /// win over street+city matches; both are case-insensitive and
    /// whitespace-trimmed.
    #[must_use]
    pub fn resolve(&self, name: &str, street: &str, city: &str) -> Option<&Property> {
        let name = match_key(name);
        if !name.is_empty()
            && let Some(property) = self.by_name.get(&name)
        {
            return Some(property);
        }
        let street = match_key(street);
        if street.is_empty() {
            return None;
        }
        self.by_street_city.get(&(street, match_key(city)))
    }

    /// Records a property so later groups in the same run can match it.
    pub fn register_property(&mut self, property: &Property) {
        let name = match_key(&property.name);
        if !name.is_empty() {
            self.by_name.insert(name, property.clone());
        }
        let street = match_key(&property.street_address);
        if !street.is_empty() {
            self.by_street_city
                .insert((street, match_key(&property.city)), property.clone());
        }
    }

    /// Whether the store (or this run) already holds a unit with this
    /// number under this property.
    #[must_use]
    pub fn unit_exists(&self, property_id: &str, unit_number: &str) -> bool {
        self.units
            .contains(&(property_id.to_string(), match_key(unit_number)))
    }

    /// Records a unit so later records in the same run skip it.
    pub fn register_unit(&mut self, property_id: &str, unit_number: &str) {
        self.units
            .insert((property_id.to_string(), match_key(unit_number)));
    }
}
