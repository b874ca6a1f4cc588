//! Proximity risk scorer.
//!
//! For each incident the minimum great-circle distance to the sampled
//! polyline is computed. The nearest incident within the radius decides
//! the tier.

use saferoute_geometry::{LatLng, haversine_m, min_distance_m, sampled};
use saferoute_incident_models::IncidentEvent;
use saferoute_risk_models::{
    CommentKind, CorridorHit, ProximityMatch, RiskAssessment, RiskComment, RiskTier,
};
use serde::{Deserialize, Serialize};

/// Default proximity radius, in meters.
pub const DEFAULT_RADIUS_M: f64 = 300.0;

/// Default number of polyline points examined per incident.
pub const DEFAULT_MAX_SAMPLES: usize = 800;

/// Maximum number of corridor hits reported for one route.
pub const MAX_CORRIDOR_HITS: usize = 60;

/// Comment shown when no incident lies within the radius.
pub const NO_NEARBY_EVENTS: &str = "No nearby events (low risk)";

/// Distance bands for tier classification, applied to the rounded
/// distance in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Strictly below this distance the tier is high.
    pub high_below_m: f64,
    /// Up to and including this distance the tier is medium.
    pub medium_up_to_m: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_below_m: 100.0,
            medium_up_to_m: 300.0,
        }
    }
}

impl RiskThresholds {
    /// Classifies a distance in meters.
    #[must_use]
    pub fn classify(&self, distance_m: f64) -> RiskTier {
        if distance_m < self.high_below_m {
            RiskTier::High
        } else if distance_m <= self.medium_up_to_m {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Scores route polylines against incident sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityScorer {
    /// Incidents farther than this from the route are ignored.
    pub radius_m: f64,
    /// Tier bands.
    pub thresholds: RiskThresholds,
    /// Upper bound on the polyline points examined per incident.
    pub max_samples: usize,
}

impl Default for ProximityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_M)
    }
}

impl ProximityScorer {
    #[must_use]
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            thresholds: RiskThresholds::default(),
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }

    /// Finds the nearest incident within the radius.
    ///
    /// Ties keep the first incident seen.
    #[must_use]
    pub fn nearest<'a, I>(&self, polyline: &[LatLng], incidents: I) -> Option<ProximityMatch>
    where
        I: IntoIterator<Item = &'a IncidentEvent>,
    {
        if polyline.is_empty() {
            return None;
        }

        let mut best: Option<(&IncidentEvent, f64)> = None;
        for incident in incidents {
            let distance = min_distance_m(polyline, incident.position(), self.max_samples);
            if distance > self.radius_m {
                continue;
            }
            match best {
                Some((_, current)) if distance >= current => {}
                _ => best = Some((incident, distance)),
            }
        }

        best.map(|(incident, distance)| ProximityMatch {
            incident: incident.clone(),
            distance_m: round_m(distance),
        })
    }

    /// Produces the full assessment for a polyline.
    ///
    /// An empty polyline yields the unscored "no route" state.
    #[must_use]
    pub fn score<'a, I>(&self, polyline: &[LatLng], incidents: I) -> RiskAssessment
    where
        I: IntoIterator<Item = &'a IncidentEvent>,
    {
        if polyline.is_empty() {
            return RiskAssessment::none();
        }

        let Some(nearest) = self.nearest(polyline, incidents) else {
            return RiskAssessment {
                tier: Some(RiskTier::Low),
                nearest: None,
                comments: vec![RiskComment {
                    kind: CommentKind::NoNearbyEvents,
                    text: NO_NEARBY_EVENTS.to_string(),
                }],
            };
        };

        let tier = self.thresholds.classify(f64::from(nearest.distance_m));
        let locality = if nearest.incident.locality.is_empty() {
            "unknown area"
        } else {
            nearest.incident.locality.as_str()
        };
        let text = format!(
            "{} {} from the route ({}) - {locality}",
            nearest.incident.category,
            nearest.formatted_distance(),
            tier.label(),
        );

        RiskAssessment {
            tier: Some(tier),
            nearest: Some(nearest),
            comments: vec![RiskComment {
                kind: CommentKind::NearestIncident,
                text,
            }],
        }
    }

    /// Sampled route points that have an incident within the radius.
    ///
    /// For each sampled point only the first incident in range is
    /// reported; at most [`MAX_CORRIDOR_HITS`] hits are returned.
    #[must_use]
    pub fn corridor_hits<'a, I>(&self, polyline: &[LatLng], incidents: I) -> Vec<CorridorHit>
    where
        I: IntoIterator<Item = &'a IncidentEvent> + Clone,
    {
        sampled(polyline, self.max_samples)
            .filter_map(|(_, point)| {
                incidents.clone().into_iter().find_map(|incident| {
                    let distance = haversine_m(point, incident.position());
                    (distance <= self.radius_m).then(|| CorridorHit {
                        point,
                        incident_id: incident.id.clone(),
                        category: incident.category.clone(),
                        distance_m: round_m(distance),
                        tier: self.thresholds.classify(distance.round()),
                    })
                })
            })
            .take(MAX_CORRIDOR_HITS)
            .collect()
    }
}

/// Scores with default thresholds and sampling.
#[must_use]
pub fn score<'a, I>(polyline: &[LatLng], incidents: I, radius_m: f64) -> RiskAssessment
where
    I: IntoIterator<Item = &'a IncidentEvent>,
{
    ProximityScorer::new(radius_m).score(polyline, incidents)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_m(distance: f64) -> u32 {
    distance.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
