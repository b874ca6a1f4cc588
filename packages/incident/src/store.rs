//! In-memory incident store.

use saferoute_incident_models::{IncidentEvent, IncidentFilter};

/// Holds the loaded incident set and the client-side filter applied to it.
///
/// Only the load routine replaces the records. Consumers read through
/// [`IncidentStore::filtered`]. Every mutation bumps
/// [`IncidentStore::revision`] so dependents can tell when their view is
/// stale.
#[derive(Debug, Clone, Default)]
pub struct IncidentStore {
    events: Vec<IncidentEvent>,
    filter: IncidentFilter,
    filtered: Vec<usize>,
    revision: u64,
}

impl IncidentStore {
    #[must_use]
    pub fn new(events: Vec<IncidentEvent>) -> Self {
        let mut store = Self::default();
        store.replace(events);
        store
    }

    /// Replaces the whole record set (a new dataset load).
    pub fn replace(&mut self, events: Vec<IncidentEvent>) {
        log::info!("Incident store loaded with {} records", events.len());
        self.events = events;
        self.refilter();
    }

    /// Sets the locality substring filter; an empty string clears it.
    pub fn set_locality_filter(&mut self, locality: &str) {
        self.filter.locality = (!locality.is_empty()).then(|| locality.to_string());
        self.refilter();
    }

    /// Sets the category filter; `None` clears it.
    pub fn set_category_filter(&mut self, category: Option<String>) {
        self.filter.category = category;
        self.refilter();
    }

    /// The currently applied filter.
    #[must_use]
    pub const fn filter(&self) -> &IncidentFilter {
        &self.filter
    }

    /// All loaded records, ignoring the filter.
    #[must_use]
    pub fn all(&self) -> &[IncidentEvent] {
        &self.events
    }

    /// Records passing the current filter, in load order.
    pub fn filtered(&self) -> impl Iterator<Item = &IncidentEvent> + Clone + '_ {
        self.filtered.iter().map(|&i| &self.events[i])
    }

    /// Owned copy of the filtered view.
    #[must_use]
    pub fn filtered_vec(&self) -> Vec<IncidentEvent> {
        self.filtered().cloned().collect()
    }

    /// Number of records passing the filter.
    #[must_use]
    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// Number of loaded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Monotonic counter bumped on every mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    fn refilter(&mut self) {
        self.filtered = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| self.filter.matches_contains(e))
            .map(|(i, _)| i)
            .collect();
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> IncidentStore {
        IncidentStore::new(vec![
            IncidentEvent::new("1", 4.6, -74.08, "theft").with_locality("Chapinero"),
            IncidentEvent::new("2", 4.7, -74.05, "assault").with_locality("Usaquén"),
            IncidentEvent::new("3", 4.65, -74.06, "theft").with_locality("Chapinero Alto"),
        ])
    }

    #[test]
    fn unfiltered_view_contains_all_records() {
        let store = store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.filtered_len(), 3);
    }

    #[test]
    fn locality_filter_is_case_insensitive_substring() {
        let mut store = store();
        store.set_locality_filter("chapi");
        let ids: Vec<&str> = store.filtered().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        store.set_locality_filter("");
        assert_eq!(store.filtered_len(), 3);
    }

    #[test]
    fn category_filter_composes_with_locality() {
        let mut store = store();
        store.set_locality_filter("chapinero");
        store.set_category_filter(Some("ASSAULT".to_string()));
        assert_eq!(store.filtered_len(), 0);
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut store = store();
        let before = store.revision();
        store.set_locality_filter("x");
        store.replace(Vec::new());
        assert_eq!(store.revision(), before + 2);
        assert!(store.is_empty());
    }
}
