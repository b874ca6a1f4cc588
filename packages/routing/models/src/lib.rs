#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Travel mode, route geometry, and turn instruction types.
//!
//! A [`RouteGeometry`] is produced by an external routing provider and is
//! never mutated after construction: a change of endpoints or mode
//! produces a fresh geometry.

use saferoute_geometry::{LatLng, format_distance, format_minutes};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How the route will be travelled.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TravelMode {
    /// On foot.
    #[strum(to_string = "walking", serialize = "walk")]
    Walking,
    /// By car.
    #[default]
    #[strum(to_string = "driving", serialize = "car")]
    Driving,
}

impl TravelMode {
    /// Fixed average speed used for time estimates, in m/s.
    #[must_use]
    pub const fn speed_m_s(self) -> f64 {
        match self {
            Self::Walking => 1.3889,
            Self::Driving => 11.1111,
        }
    }

    /// Estimated travel time for a distance, rounded to whole seconds.
    #[must_use]
    pub fn estimate_time_s(self, distance_m: f64) -> f64 {
        (distance_m / self.speed_m_s()).round()
    }
}

/// One raw maneuver as reported by the routing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maneuver {
    /// Maneuver type (e.g. "depart", "turn", "roundabout").
    pub kind: String,
    /// Direction modifier (e.g. "left", "slight right").
    pub modifier: Option<String>,
    /// Name of the road the maneuver leads onto.
    pub road: Option<String>,
    /// Roundabout exit number.
    pub exit: Option<u32>,
    /// Where the maneuver happens.
    pub location: Option<LatLng>,
    /// Distance of the step that follows, in meters.
    pub distance_m: f64,
    /// Duration of the step that follows, in seconds.
    pub duration_s: f64,
}

impl Maneuver {
    /// A maneuver with only its type set.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            modifier: None,
            road: None,
            exit: None,
            location: None,
            distance_m: 0.0,
            duration_s: 0.0,
        }
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    #[must_use]
    pub fn with_road(mut self, road: impl Into<String>) -> Self {
        self.road = Some(road.into());
        self
    }

    #[must_use]
    pub const fn with_exit(mut self, exit: u32) -> Self {
        self.exit = Some(exit);
        self
    }

    #[must_use]
    pub const fn at(mut self, location: LatLng) -> Self {
        self.location = Some(location);
        self
    }
}

/// One humanized turn instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    /// Position in the instruction list.
    pub index: usize,
    /// Display / speech text.
    pub text: String,
    /// Coordinate the instruction refers to.
    pub anchor: Option<LatLng>,
    /// Distance of the step, in meters.
    pub distance_m: f64,
    /// Duration of the step, in seconds.
    pub duration_s: f64,
}

impl Instruction {
    /// A text-only instruction, used for provider failures.
    #[must_use]
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            index: 0,
            text: text.into(),
            anchor: None,
            distance_m: 0.0,
            duration_s: 0.0,
        }
    }
}

/// A computed route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteGeometry {
    /// Polyline, start to end.
    pub coordinates: Vec<LatLng>,
    /// Total length in meters, as reported by the provider.
    pub distance_m: f64,
    /// Travel time derived from distance and the mode's fixed speed.
    pub estimated_time_s: f64,
    /// Raw maneuvers, "depart" first and "arrive" last.
    pub maneuvers: Vec<Maneuver>,
}

impl RouteGeometry {
    /// Builds a geometry; the time estimate ignores any provider estimate.
    #[must_use]
    pub fn new(coordinates: Vec<LatLng>, distance_m: f64, maneuvers: Vec<Maneuver>, mode: TravelMode) -> Self {
        Self {
            coordinates,
            distance_m,
            estimated_time_s: mode.estimate_time_s(distance_m),
            maneuvers,
        }
    }

    /// Display summary.
    #[must_use]
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            distance_m: self.distance_m,
            estimated_time_s: self.estimated_time_s,
            distance_text: format_distance(self.distance_m),
            time_text: format_minutes(self.estimated_time_s),
            point_count: self.coordinates.len(),
        }
    }
}

/// Distance and time of a route, raw and formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub distance_m: f64,
    pub estimated_time_s: f64,
    pub distance_text: String,
    pub time_text: String,
    pub point_count: usize,
}
