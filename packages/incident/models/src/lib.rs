#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Historical incident record types.
//!
//! An [`IncidentEvent`] is one geolocated record of an adverse event used
//! as a risk signal. Records are immutable once loaded; the store in
//! `saferoute_incident` owns them for the lifetime of a dataset load.

use std::collections::BTreeMap;

use saferoute_geometry::LatLng;
use serde::{Deserialize, Serialize};

/// Category assigned to records that carry no category label.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Per-year incident counts, keyed by calendar year.
pub type YearCounts = BTreeMap<u16, f64>;

/// One normalized historical incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentEvent {
    /// Unique identifier within the loaded dataset.
    pub id: String,
    /// Latitude (WGS84), always finite.
    pub latitude: f64,
    /// Longitude (WGS84), always finite.
    pub longitude: f64,
    /// Free-form category label (e.g. "theft").
    pub category: String,
    /// Free-form locality label, possibly empty.
    pub locality: String,
    /// Administrative code of the locality, shared by all its records.
    pub locality_code: Option<String>,
    /// Reporting period label (e.g. "Jan-Sep (2024vs2025)").
    pub period: Option<String>,
    /// Incident counts per year.
    pub year_counts: YearCounts,
    /// Percent change between the compared periods.
    pub percent_change: Option<f64>,
    /// City-wide total for the same category.
    pub city_total: Option<f64>,
}

impl IncidentEvent {
    /// Creates an event with only the required fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            category: category.into(),
            locality: String::new(),
            locality_code: None,
            period: None,
            year_counts: YearCounts::new(),
            percent_change: None,
            city_total: None,
        }
    }

    /// Sets the locality label.
    #[must_use]
    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = locality.into();
        self
    }

    /// Sets the period label.
    #[must_use]
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// The record's position.
    #[must_use]
    pub const fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// Dataset keys per field, in lookup order.
const ID_KEYS: &[&str] = &["id"];
const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LNG_KEYS: &[&str] = &["lng", "lon", "longitude"];
const CATEGORY_KEYS: &[&str] = &["tipo", "type", "category"];
const LOCALITY_KEYS: &[&str] = &["nombre_localidad", "barrio", "locality"];
const LOCALITY_CODE_KEYS: &[&str] = &["codigo_localidad", "localityCode", "locality_code"];
const PERIOD_KEYS: &[&str] = &["mes", "period"];
const PERCENT_CHANGE_KEYS: &[&str] =
    &["variacion_porcentaje", "percentChange", "percent_change"];
const CITY_TOTAL_KEYS: &[&str] = &["total_bogota", "cityTotal", "city_total"];

/// A raw record as delivered by an incident data source, before
/// normalization.
///
/// Two shapes are accepted: the marker shape carries a `position`
/// `[lat, lng]` pair, the flat shape carries separate latitude and
/// longitude fields. Each field is read from the first of its dataset
/// keys that is present and not `null`, so a record carrying several
/// spellings of one field is still readable. Values are kept as raw JSON
/// and coerced during normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawIncident {
    pub id: Option<serde_json::Value>,
    pub position: Option<Vec<serde_json::Value>>,
    pub lat: Option<serde_json::Value>,
    pub lng: Option<serde_json::Value>,
    pub category: Option<serde_json::Value>,
    pub locality: Option<serde_json::Value>,
    pub locality_code: Option<serde_json::Value>,
    pub period: Option<serde_json::Value>,
    pub percent_change: Option<serde_json::Value>,
    pub city_total: Option<serde_json::Value>,
    /// Every key of the record, including the `anio_YYYY` year counts.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RawIncident {
    /// Reads a record from a JSON value. Returns `None` if the value is not
    /// an object.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let field = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| object.get(*key))
                .find(|v| !v.is_null())
                .cloned()
        };

        Some(Self {
            id: field(ID_KEYS),
            position: object.get("position").and_then(serde_json::Value::as_array).cloned(),
            lat: field(LAT_KEYS),
            lng: field(LNG_KEYS),
            category: field(CATEGORY_KEYS),
            locality: field(LOCALITY_KEYS),
            locality_code: field(LOCALITY_CODE_KEYS),
            period: field(PERIOD_KEYS),
            percent_change: field(PERCENT_CHANGE_KEYS),
            city_total: field(CITY_TOTAL_KEYS),
            extra: object
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }
}

/// Filter over the incident set. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFilter {
    /// Category label.
    pub category: Option<String>,
    /// Locality label.
    pub locality: Option<String>,
    /// Period label.
    pub period: Option<String>,
}

impl IncidentFilter {
    /// Filter on locality only.
    #[must_use]
    pub fn locality(locality: impl Into<String>) -> Self {
        Self {
            locality: Some(locality.into()),
            ..Self::default()
        }
    }

    /// Case-insensitive equality on every set field.
    #[must_use]
    pub fn matches_exact(&self, event: &IncidentEvent) -> bool {
        eq_ignore_case(self.category.as_deref(), &event.category)
            && eq_ignore_case(self.locality.as_deref(), &event.locality)
            && eq_ignore_case(self.period.as_deref(), event.period.as_deref().unwrap_or(""))
    }

    /// Case-insensitive equality on category and period, substring match
    /// on locality.
    #[must_use]
    pub fn matches_contains(&self, event: &IncidentEvent) -> bool {
        let locality_ok = self.locality.as_deref().is_none_or(|needle| {
            needle.is_empty() || event.locality.to_lowercase().contains(&needle.to_lowercase())
        });
        locality_ok
            && eq_ignore_case(self.category.as_deref(), &event.category)
            && eq_ignore_case(self.period.as_deref(), event.period.as_deref().unwrap_or(""))
    }

    /// Returns `true` if no field constrains the result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.category, &self.locality, &self.period]
            .iter()
            .all(|f| f.as_deref().is_none_or(str::is_empty))
    }
}

fn eq_ignore_case(wanted: Option<&str>, actual: &str) -> bool {
    wanted.is_none_or(|w| w.is_empty() || w.to_lowercase() == actual.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> IncidentEvent {
        IncidentEvent::new("1", 4.6, -74.08, "Theft")
            .with_locality("Chapinero")
            .with_period("Jan-Sep")
    }

    #[test]
    fn exact_filter_ignores_case() {
        let filter = IncidentFilter {
            category: Some("theft".to_string()),
            locality: Some("CHAPINERO".to_string()),
            period: None,
        };
        assert!(filter.matches_exact(&event()));
        assert!(!IncidentFilter::locality("chap").matches_exact(&event()));
    }

    #[test]
    fn contains_filter_matches_locality_substring() {
        assert!(IncidentFilter::locality("pine").matches_contains(&event()));
        assert!(!IncidentFilter::locality("suba").matches_contains(&event()));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = IncidentFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches_exact(&event()));
        assert!(filter.matches_contains(&IncidentEvent::new("2", 0.0, 0.0, "x")));
    }

    #[test]
    fn raw_incident_accepts_dataset_aliases() {
        let raw = RawIncident::from_value(&serde_json::json!({
            "tipo": "Hurto",
            "nombre_localidad": "Suba",
            "lat": "4.7",
            "lng": -74.1,
            "anio_2024": 12
        }))
        .unwrap();
        assert_eq!(raw.category, Some(serde_json::json!("Hurto")));
        assert_eq!(raw.locality, Some(serde_json::json!("Suba")));
        assert!(raw.extra.contains_key("anio_2024"));
    }

    #[test]
    fn first_present_spelling_wins() {
        let raw = RawIncident::from_value(&serde_json::json!({
            "lat": null,
            "latitude": 4.7,
            "lng": -74.1,
            "lon": -80.0,
            "tipo": "Hurto",
            "type": "theft"
        }))
        .unwrap();
        assert_eq!(raw.lat, Some(serde_json::json!(4.7)));
        assert_eq!(raw.lng, Some(serde_json::json!(-74.1)));
        assert_eq!(raw.category, Some(serde_json::json!("Hurto")));
    }

    #[test]
    fn non_object_is_not_a_record() {
        assert!(RawIncident::from_value(&serde_json::json!([4.6, -74.08])).is_none());
        assert!(RawIncident::from_value(&serde_json::json!("x")).is_none());
    }
}
