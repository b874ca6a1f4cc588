#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk tier and route risk assessment types.
//!
//! A [`RiskAssessment`] is produced for each route pipeline (preview and
//! active). The local proximity scorer fills in the tier and nearest
//! incident; a remote advisory opinion may later be merged into its
//! comment list.

use saferoute_geometry::{LatLng, format_distance};
use saferoute_incident_models::IncidentEvent;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Discretized risk classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RiskTier {
    /// No incident close to the route.
    Low,
    /// An incident within the medium band.
    Medium,
    /// An incident very close to the route.
    High,
}

impl RiskTier {
    /// Lower-case label used in comment text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses a tier label from a remote classifier, accepting the
    /// English names and the dataset's Spanish names.
    #[must_use]
    pub fn from_remote_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "bajo" => Some(Self::Low),
            "medium" | "medio" => Some(Self::Medium),
            "high" | "alto" => Some(Self::High),
            _ => None,
        }
    }
}

/// Nearest incident found within the proximity radius of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityMatch {
    /// The nearest incident.
    pub incident: IncidentEvent,
    /// Distance to the route, rounded to whole meters.
    pub distance_m: u32,
}

impl ProximityMatch {
    /// The distance formatted for display.
    #[must_use]
    pub fn formatted_distance(&self) -> String {
        format_distance(f64::from(self.distance_m))
    }
}

/// What a comment line explains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentKind {
    /// No incident within the radius.
    NoNearbyEvents,
    /// Explanation of the nearest incident.
    NearestIncident,
    /// Opinion of the remote risk advisor.
    RemoteOpinion,
}

/// One line of human-readable risk commentary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskComment {
    /// What this comment explains.
    pub kind: CommentKind,
    /// Display text.
    pub text: String,
}

/// Opinion returned by the remote risk advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    /// Tier label as reported by the remote model.
    pub tier_label: String,
    /// Numeric score reported by the remote model.
    pub score: f64,
    /// Number of points the remote model evaluated, if reported.
    pub total_points: Option<u64>,
}

impl Advisory {
    /// Comment text for this opinion.
    #[must_use]
    pub fn comment_text(&self) -> String {
        format!("Model: {} risk (score {:.2})", self.tier_label, self.score)
    }
}

/// A sampled route point with an incident inside the proximity radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorHit {
    /// The route point.
    pub point: LatLng,
    /// Id of the first incident found within the radius of the point.
    pub incident_id: String,
    /// Category of that incident.
    pub category: String,
    /// Distance from the point to the incident, rounded to meters.
    pub distance_m: u32,
    /// Tier for that distance.
    pub tier: RiskTier,
}

/// Risk assessment for one route pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Tier, or `None` while no route has been scored.
    pub tier: Option<RiskTier>,
    /// Nearest incident within the radius, if any.
    pub nearest: Option<ProximityMatch>,
    /// Commentary, newest remote opinion first.
    pub comments: Vec<RiskComment>,
}

impl RiskAssessment {
    /// The initial "no route" state.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            tier: None,
            nearest: None,
            comments: Vec::new(),
        }
    }

    /// Returns `true` once a route has been scored.
    #[must_use]
    pub const fn is_scored(&self) -> bool {
        self.tier.is_some()
    }

    /// Returns `true` if the scorer found no incident within the radius.
    #[must_use]
    pub fn has_no_nearby_events(&self) -> bool {
        self.comments
            .iter()
            .any(|c| c.kind == CommentKind::NoNearbyEvents)
    }

    /// Puts a remote opinion in front of the local explanation, replacing
    /// any earlier remote opinion, and keeps at most `cap` comments.
    pub fn merge_advisory(&mut self, advisory: &Advisory, cap: usize) {
        self.comments.retain(|c| c.kind != CommentKind::RemoteOpinion);
        self.comments.insert(
            0,
            RiskComment {
                kind: CommentKind::RemoteOpinion,
                text: advisory.comment_text(),
            },
        );
        self.comments.truncate(cap);
    }
}
