#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote risk advisor.
//!
//! The advisor is a secondary opinion on a route: the route is thinned to
//! at most [`DEFAULT_MAX_POINTS`] points and posted to
//! `/api/predict_route_risk`. Failures are never fatal to the session;
//! the local proximity assessment stands on its own.

use std::time::Duration;

use async_trait::async_trait;
use saferoute_geometry::{LatLng, subsample};
use saferoute_risk_models::Advisory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of route points sent to the advisor.
pub const DEFAULT_MAX_POINTS: usize = 200;

/// Advisor endpoint path.
pub const PREDICT_PATH: &str = "/api/predict_route_risk";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Errors that can occur while asking the advisor.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The advisor rejected the request.
    #[error("Advisor error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },
}

/// A remote service that rates a route.
#[async_trait]
pub trait RiskAdvisor: Send + Sync {
    /// Returns the advisor's opinion on an already-subsampled point list.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError`] if the advisor cannot be reached or
    /// answers with something unreadable.
    async fn opinion(&self, points: &[LatLng]) -> Result<Advisory, AdvisorError>;
}

/// Request body: `{"points": [[lat, lng], ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub points: Vec<[f64; 2]>,
}

impl PredictRequest {
    /// Thins a route to at most `max_points` using the shared stride rule.
    #[must_use]
    pub fn from_route(route: &[LatLng], max_points: usize) -> Self {
        Self {
            points: prepare_points(route, max_points)
                .into_iter()
                .map(LatLng::to_pair)
                .collect(),
        }
    }
}

/// Keeps every `stride`-th point so that at most about `max_points` remain.
#[must_use]
pub fn prepare_points(route: &[LatLng], max_points: usize) -> Vec<LatLng> {
    subsample(route, max_points)
}

/// Response body. Both the English and the Spanish field names are
/// accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(alias = "nivel_riesgo", alias = "riskLevel")]
    pub tier: String,
    #[serde(alias = "puntuacion")]
    pub score: f64,
    #[serde(default, alias = "total_puntos", alias = "totalPoints")]
    pub total_points: Option<u64>,
}

impl From<PredictResponse> for Advisory {
    fn from(resp: PredictResponse) -> Self {
        Self {
            tier_label: resp.tier,
            score: resp.score,
            total_points: resp.total_points,
        }
    }
}

/// Decodes an advisor response body.
///
/// # Errors
///
/// Returns [`AdvisorError::Json`] if the body lacks a tier or score.
pub fn parse_response(body: &str) -> Result<Advisory, AdvisorError> {
    let resp: PredictResponse = serde_json::from_str(body)?;
    Ok(resp.into())
}

/// Advisor reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAdvisor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAdvisor {
    /// Creates an advisor with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AdvisorError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates an advisor sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{PREDICT_PATH}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RiskAdvisor for HttpAdvisor {
    async fn opinion(&self, points: &[LatLng]) -> Result<Advisory, AdvisorError> {
        let body = PredictRequest {
            points: points.iter().map(|p| p.to_pair()).collect(),
        };
        log::debug!("Posting {} points to the risk advisor", body.points.len());

        let resp = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(AdvisorError::Provider {
                message: format!("HTTP {status}: {text}"),
            });
        }

        parse_response(&text)
    }
}
