#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local risk evaluation of a route against the incident set.
//!
//! [`scorer::ProximityScorer`] is pure and synchronous: identical
//! polyline, incidents, and radius always produce an identical
//! [`RiskAssessment`]. [`alert::AlertTrigger`] turns the stream of tiers
//! into one-shot high-risk alerts.

pub mod advice;
pub mod alert;
pub mod scorer;

pub use alert::AlertTrigger;
pub use saferoute_risk_models::{RiskAssessment, RiskTier};
pub use scorer::{ProximityScorer, RiskThresholds, score};
