//! Normalization of raw incident records.
//!
//! Mirrors the two payload shapes served by the incident API: the
//! marker endpoint nests coordinates in a `position` pair, the full
//! listing carries flat latitude/longitude fields.

use saferoute_incident_models::{IncidentEvent, RawIncident, UNKNOWN_CATEGORY, YearCounts};

use crate::IncidentError;

/// Year-count key prefixes recognized in raw records.
const YEAR_PREFIXES: &[&str] = &["anio_", "year_"];

/// Which payload shape a batch uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `{ "position": [lat, lng], ... }`
    PositionPair,
    /// `{ "lat": .., "lng": .., ... }` and aliases.
    Flat,
}

/// Result of normalizing one batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Records that passed validation.
    pub events: Vec<IncidentEvent>,
    /// Number of records dropped for missing or non-finite coordinates
    /// or an unreadable layout.
    pub dropped: usize,
}

/// Detects the shape of a batch from its first record.
#[must_use]
pub fn detect_shape(records: &[serde_json::Value]) -> RecordShape {
    match records.first() {
        Some(first) if first.get("position").is_some() => RecordShape::PositionPair,
        _ => RecordShape::Flat,
    }
}

/// Normalizes a JSON payload that should be an array of records.
///
/// A payload that is not an array yields an empty batch, matching the
/// API contract that a failed server-side load returns `[]`.
#[must_use]
pub fn normalize_value(payload: &serde_json::Value) -> NormalizedBatch {
    payload
        .as_array()
        .map_or_else(NormalizedBatch::default, |records| normalize(records))
}

/// Parses and normalizes a JSON document containing a record array.
///
/// # Errors
///
/// Returns [`IncidentError`] if the text is not valid JSON or is not an
/// array.
pub fn normalize_str(text: &str) -> Result<NormalizedBatch, IncidentError> {
    let payload: serde_json::Value = serde_json::from_str(text)?;
    if !payload.is_array() {
        return Err(IncidentError::Normalization {
            message: "incident payload is not a JSON array".to_string(),
        });
    }
    Ok(normalize_value(&payload))
}

/// Normalizes a batch of raw records.
#[must_use]
pub fn normalize(records: &[serde_json::Value]) -> NormalizedBatch {
    let shape = detect_shape(records);
    let mut batch = NormalizedBatch::default();

    for (idx, value) in records.iter().enumerate() {
        let Some(raw) = RawIncident::from_value(value) else {
            log::debug!("Dropping incident record {idx}: not an object");
            batch.dropped += 1;
            continue;
        };

        match normalize_record(raw, idx, shape) {
            Some(event) => batch.events.push(event),
            None => batch.dropped += 1,
        }
    }

    if batch.dropped > 0 {
        log::warn!(
            "Dropped {} of {} incident records without usable coordinates",
            batch.dropped,
            records.len()
        );
    }

    batch
}

/// Normalizes one record; `None` if it lacks finite coordinates.
#[must_use]
pub fn normalize_record(raw: RawIncident, idx: usize, shape: RecordShape) -> Option<IncidentEvent> {
    let (latitude, longitude) = match shape {
        RecordShape::PositionPair => {
            let pair = raw.position.as_deref()?;
            (number(pair.first()?)?, number(pair.get(1)?)?)
        }
        RecordShape::Flat => (number(raw.lat.as_ref()?)?, number(raw.lng.as_ref()?)?),
    };
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }

    let id = raw.id.as_ref().and_then(label).unwrap_or_else(|| idx.to_string());

    Some(IncidentEvent {
        id,
        latitude,
        longitude,
        category: raw
            .category
            .as_ref()
            .and_then(label)
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        locality: raw.locality.as_ref().and_then(label).unwrap_or_default(),
        locality_code: raw.locality_code.as_ref().and_then(label),
        period: raw.period.as_ref().and_then(label),
        year_counts: year_counts(&raw.extra),
        percent_change: raw.percent_change.as_ref().and_then(number),
        city_total: raw.city_total.as_ref().and_then(number),
    })
}

/// Reads a number from a JSON number or numeric string.
fn number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a non-empty label from a JSON scalar; numbers and booleans are
/// rendered as text.
fn label(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn year_counts(extra: &std::collections::BTreeMap<String, serde_json::Value>) -> YearCounts {
    extra
        .iter()
        .filter_map(|(key, value)| {
            let year = YEAR_PREFIXES
                .iter()
                .find_map(|prefix| key.strip_prefix(prefix))?
                .parse::<u16>()
                .ok()?;
            Some((year, number(value)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_position_pair_shape() {
        let records = vec![json!({
            "position": [4.60, -74.08],
            "tipo": "Hurto",
            "nombre_localidad": "Santa Fe",
            "codigo_localidad": 3,
            "mes": "Ene-Sep",
            "anio_2024": 10,
            "anio_2025": 7,
            "variacion_porcentaje": -30.0,
            "total_bogota": 1200
        })];
        let batch = normalize(&records);
        assert_eq!(batch.dropped, 0);
        let event = &batch.events[0];
        assert_eq!(event.id, "0");
        assert!((event.latitude - 4.60).abs() < f64::EPSILON);
        assert_eq!(event.category, "Hurto");
        assert_eq!(event.locality, "Santa Fe");
        assert_eq!(event.locality_code.as_deref(), Some("3"));
        assert_eq!(event.period.as_deref(), Some("Ene-Sep"));
        assert_eq!(event.year_counts.get(&2025).copied(), Some(7.0));
        assert_eq!(event.percent_change, Some(-30.0));
        assert_eq!(event.city_total, Some(1200.0));
    }

    #[test]
    fn normalizes_flat_shape_with_aliases() {
        let records = vec![
            json!({ "id": "a", "latitude": "4.61", "longitude": -74.07 }),
            json!({ "id": 9, "lat": 4.62, "lon": -74.06, "type": "theft" }),
        ];
        let batch = normalize(&records);
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.events[0].id, "a");
        assert_eq!(batch.events[0].category, UNKNOWN_CATEGORY);
        assert_eq!(batch.events[1].id, "9");
        assert_eq!(batch.events[1].category, "theft");
    }

    #[test]
    fn drops_records_without_finite_coordinates() {
        let records = vec![
            json!({ "lat": 4.6 }),
            json!({ "lat": "abc", "lng": -74.0 }),
            json!({ "lat": null, "lng": -74.0 }),
            json!({ "lat": 4.6, "lng": -74.0 }),
        ];
        let batch = normalize(&records);
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.dropped, 3);
        assert_eq!(batch.events[0].id, "3");
    }

    #[test]
    fn keeps_records_with_numeric_labels_or_repeated_keys() {
        let records = vec![
            json!({ "lat": 4.60, "lng": -74.08, "tipo": 5 }),
            json!({ "lat": 4.61, "lng": -74.07, "mes": 3 }),
            json!({ "lat": 4.62, "latitude": 9.0, "lng": -74.06 }),
            json!({ "lat": 4.63, "lng": -74.05, "tipo": "Hurto", "type": "theft" }),
            json!({ "lat": 4.64, "lng": -74.04 }),
        ];
        let batch = normalize(&records);
        assert_eq!(batch.dropped, 0);
        assert_eq!(batch.events.len(), 5);
        assert_eq!(batch.events[0].category, "5");
        assert_eq!(batch.events[1].period.as_deref(), Some("3"));
        assert!((batch.events[2].latitude - 4.62).abs() < f64::EPSILON);
        assert_eq!(batch.events[3].category, "Hurto");
        assert_eq!(batch.events[4].category, UNKNOWN_CATEGORY);
    }

    #[test]
    fn shape_is_chosen_from_first_record() {
        let records = vec![
            json!({ "position": [1.0, 2.0] }),
            json!({ "lat": 1.0, "lng": 2.0 }),
        ];
        assert_eq!(detect_shape(&records), RecordShape::PositionPair);
        let batch = normalize(&records);
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.dropped, 1);
    }

    #[test]
    fn non_array_payload_is_rejected() {
        assert!(normalize_str("{\"detail\": \"oops\"}").is_err());
        assert!(normalize_value(&json!({"detail": "oops"})).events.is_empty());
    }
}
