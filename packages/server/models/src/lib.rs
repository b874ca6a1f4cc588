#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the saferoute server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from [`IncidentEvent`] so the wire contract can evolve on its own.
//! Both incident shapes round-trip through the client-side normalizer.

use std::collections::BTreeMap;

use saferoute_incident_models::{IncidentEvent, IncidentFilter};
use saferoute_risk_models::RiskTier;
use serde::{Deserialize, Serialize};

/// `GET /` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRoot {
    pub message: String,
    /// Dataset file the server reads on every request.
    pub data_path: String,
}

/// `GET /api/health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// An incident in the flat shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncident {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: String,
    pub locality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_total: Option<f64>,
    /// Counts keyed `year_YYYY`.
    #[serde(flatten)]
    pub years: BTreeMap<String, f64>,
}

impl From<IncidentEvent> for ApiIncident {
    fn from(event: IncidentEvent) -> Self {
        Self {
            id: event.id,
            latitude: event.latitude,
            longitude: event.longitude,
            category: event.category,
            locality: event.locality,
            locality_code: event.locality_code,
            period: event.period,
            percent_change: event.percent_change,
            city_total: event.city_total,
            years: event
                .year_counts
                .into_iter()
                .map(|(year, count)| (format!("year_{year}"), count))
                .collect(),
        }
    }
}

/// An incident in the lightweight marker shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarker {
    pub id: String,
    /// `[lat, lng]`.
    pub position: [f64; 2],
    pub category: String,
    pub locality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

impl From<IncidentEvent> for ApiMarker {
    fn from(event: IncidentEvent) -> Self {
        Self {
            position: [event.latitude, event.longitude],
            id: event.id,
            category: event.category,
            locality: event.locality,
            period: event.period,
        }
    }
}

/// Query parameters for the incident endpoints. Matching is
/// case-insensitive equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncidentQueryParams {
    #[serde(default, alias = "tipo")]
    pub category: Option<String>,
    #[serde(default, alias = "nombre_localidad")]
    pub locality: Option<String>,
    #[serde(default, alias = "mes")]
    pub period: Option<String>,
}

impl From<IncidentQueryParams> for IncidentFilter {
    fn from(params: IncidentQueryParams) -> Self {
        Self {
            category: params.category,
            locality: params.locality,
            period: params.period,
        }
    }
}

/// `POST /api/predict_route_risk` body: `[lat, lng]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePointsRequest {
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
}

/// `POST /api/predict_route_risk` response. Field names match the
/// existing web client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRiskPrediction {
    #[serde(rename = "nivel_riesgo")]
    pub tier: String,
    #[serde(rename = "puntuacion")]
    pub score: f64,
    #[serde(rename = "total_puntos")]
    pub total_points: u64,
}

impl ApiRiskPrediction {
    /// Heuristic used until a trained model is deployed: the score grows
    /// by 0.1 per point up to 1.0. Tiers compare the unrounded product, so
    /// 3 points land just above the medium bound and 6 just above the high
    /// bound.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_point_count(count: usize) -> Self {
        let score = (0.1 * count as f64).min(1.0);
        let tier = if score > 0.6 {
            RiskTier::High
        } else if score > 0.3 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        };
        Self {
            tier: tier_name(tier).to_string(),
            score: (score * 100.0).round() / 100.0,
            total_points: count as u64,
        }
    }
}

const fn tier_name(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Low => "Low",
        RiskTier::Medium => "Medium",
        RiskTier::High => "High",
    }
}
