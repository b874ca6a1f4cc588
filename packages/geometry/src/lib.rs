#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry utilities shared by the scorer, the advisor client, and the
//! instruction cursor.
//!
//! Every polyline walk in the system goes through the stride helpers here
//! so that long routes cost a bounded number of distance evaluations.

use geo::{Distance, HaversineMeasure, Point};
use serde::{Deserialize, Serialize};

/// Sphere radius used for all great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const HAVERSINE: HaversineMeasure = HaversineMeasure::new(EARTH_RADIUS_M);

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both components are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Converts to a `geo` point (x = longitude, y = latitude).
    #[must_use]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }

    /// Returns the `[lat, lng]` pair used on the wire.
    #[must_use]
    pub const fn to_pair(self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two coordinates, in meters.
#[must_use]
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    HAVERSINE.distance(a.to_point(), b.to_point())
}

/// Sampling stride that keeps a walk over `count` points to roughly
/// `max_samples` evaluations: `max(1, floor(count / max_samples))`.
#[must_use]
pub fn stride_for(count: usize, max_samples: usize) -> usize {
    if max_samples == 0 {
        return 1;
    }
    (count / max_samples).max(1)
}

/// Iterates `(index, point)` pairs of `points` at the stride chosen by
/// [`stride_for`].
pub fn sampled(points: &[LatLng], max_samples: usize) -> impl Iterator<Item = (usize, LatLng)> + '_ {
    points
        .iter()
        .copied()
        .enumerate()
        .step_by(stride_for(points.len(), max_samples))
}

/// Collects the sampled points of a polyline.
#[must_use]
pub fn subsample(points: &[LatLng], max_samples: usize) -> Vec<LatLng> {
    sampled(points, max_samples).map(|(_, p)| p).collect()
}

/// The sampled polyline point closest to a target coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestSample {
    /// Index of the point in the full (unsampled) polyline.
    pub index: usize,
    /// Great-circle distance to the target, in meters.
    pub distance_m: f64,
}

/// Finds the sampled point of `points` nearest to `target`.
///
/// Ties keep the earliest index. Returns `None` for an empty polyline.
#[must_use]
pub fn nearest_sample(points: &[LatLng], target: LatLng, max_samples: usize) -> Option<NearestSample> {
    let mut best: Option<NearestSample> = None;

    for (index, point) in sampled(points, max_samples) {
        let distance_m = haversine_m(target, point);
        match best {
            Some(current) if distance_m >= current.distance_m => {}
            _ => best = Some(NearestSample { index, distance_m }),
        }
    }

    best
}

/// Minimum distance from `target` to any sampled point of `points`.
///
/// Stops early once an exact hit (zero distance) is found. Returns
/// `f64::INFINITY` for an empty polyline.
#[must_use]
pub fn min_distance_m(points: &[LatLng], target: LatLng, max_samples: usize) -> f64 {
    let mut min = f64::INFINITY;
    for (_, point) in sampled(points, max_samples) {
        min = min.min(haversine_m(point, target));
        if min <= 0.0 {
            break;
        }
    }
    min
}

/// Formats a distance: kilometers with two decimals at or above 1 km,
/// whole meters below.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round())
    }
}

/// Formats a duration in seconds as minutes with one decimal.
#[must_use]
pub fn format_minutes(seconds: f64) -> String {
    format!("{:.1} min", seconds / 60.0)
}
