//! Display filters for the live view.
//!
//! Filtering is applied to a batch on every render. It never changes the
//! batch itself, and the result is a subset of the input in the same order.

use serde::{Deserialize, Serialize};

use crate::model::Entity;

/// User-selected filter criteria. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// Callsign prefix, compared case-insensitively after trimming.
    pub callsign_prefix: String,
    /// Substring of the origin country, compared case-insensitively.
    pub country_substring: String,
}

impl Filters {
    /// Filters matching every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callsign prefix.
    #[must_use]
    pub fn with_callsign_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.callsign_prefix = prefix.into();
        self
    }

    /// Set the country substring.
    #[must_use]
    pub fn with_country_substring(mut self, substring: impl Into<String>) -> Self {
        self.country_substring = substring.into();
        self
    }

    /// Whether no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callsign_prefix.trim().is_empty() && self.country_substring.trim().is_empty()
    }

    /// Check a single entity against both criteria.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        let prefix = normalize(&self.callsign_prefix);
        let country = normalize(&self.country_substring);

        Self::matches_normalized(entity, &prefix, &country)
    }

    fn matches_normalized(entity: &Entity, prefix: &str, country: &str) -> bool {
        let callsign_ok = prefix.is_empty()
            || entity
                .callsign
                .as_deref()
                .is_some_and(|c| normalize(c).starts_with(prefix));

        let country_ok = country.is_empty()
            || entity
                .origin_country
                .as_deref()
                .is_some_and(|c| normalize(c).contains(country));

        callsign_ok && country_ok
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Return the entities that pass `filters`, preserving order.
#[must_use]
pub fn apply_filters(entities: &[Entity], filters: &Filters) -> Vec<Entity> {
    if filters.is_empty() {
        return entities.to_vec();
    }

    let prefix = normalize(&filters.callsign_prefix);
    let country = normalize(&filters.country_substring);

    entities
        .iter()
        .filter(|entity| Filters::matches_normalized(entity, &prefix, &country))
        .cloned()
        .collect()
}
