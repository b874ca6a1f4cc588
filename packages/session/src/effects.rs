//! Outputs of session transitions.
//!
//! The session never performs I/O. Each transition returns the effects
//! the caller must carry out (commands) or may surface (notifications).

use saferoute_geometry::LatLng;
use saferoute_risk_models::{RiskAssessment, RiskTier};
use saferoute_routing_models::TravelMode;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Tag identifying the session configuration a request was issued for.
pub type Generation = u64;

/// Lifecycle phase of a route session.
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
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// No route requested.
    #[default]
    Idle,
    /// Route requested or shown, no voice or tracking.
    Previewing,
    /// Navigating.
    Active,
}

/// Which of the two risk pipelines an effect concerns.
#[derive(
    Debug,
    Clone,
    Copy,
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
#[strum(serialize_all = "lowercase")]
pub enum PipelineKind {
    Preview,
    Active,
}

/// User-visible, non-fatal problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum Notice {
    /// The incident dataset could not be loaded; scoring runs on an empty set.
    DatasetUnavailable(String),
    /// The routing provider could not compute a route.
    RouteUnavailable(String),
    /// Live position tracking is unavailable or was denied.
    TrackingUnavailable(String),
}

/// One output of a session transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the routing provider for a route.
    RequestRoute {
        pipeline: PipelineKind,
        generation: Generation,
        start: LatLng,
        end: LatLng,
        mode: TravelMode,
    },
    /// Ask the remote advisor for an opinion on already-thinned points.
    RequestAdvice {
        pipeline: PipelineKind,
        generation: Generation,
        points: Vec<LatLng>,
    },
    /// Begin streaming live positions.
    StartTracking,
    /// Stop streaming live positions.
    StopTracking,
    /// Silence any ongoing speech or audio.
    StopVoice,
    /// Speak a sentence.
    Speak(String),

    PhaseChanged(Phase),
    /// A pipeline's assessment changed.
    AssessmentChanged {
        pipeline: PipelineKind,
        assessment: RiskAssessment,
    },
    /// The active route's current instruction changed.
    InstructionChanged { index: usize, text: String },
    /// The authoritative tier became high.
    Alert { tier: RiskTier, advice: String },
    Notice(Notice),
}

impl Effect {
    /// Returns `true` for effects the driver must execute.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::RequestRoute { .. }
                | Self::RequestAdvice { .. }
                | Self::StartTracking
                | Self::StopTracking
                | Self::StopVoice
                | Self::Speak(_)
        )
    }
}
