//! OSRM `route/v1` client.
//!
//! Requests full GeoJSON geometry with steps, e.g.
//! `{base}/car/-74.08,4.60;-74.07,4.61?overview=full&geometries=geojson&steps=true`.
//! OSRM coordinates are `[lng, lat]`; everything leaving this module is
//! [`LatLng`].

use std::time::Duration;

use async_trait::async_trait;
use saferoute_geometry::LatLng;
use saferoute_routing_models::{Maneuver, RouteGeometry, TravelMode};
use serde::Deserialize;

use crate::{RouteProvider, RoutingError};

/// Public OSRM demo server.
pub const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org/route/v1";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// OSRM profile name for a travel mode.
#[must_use]
pub const fn profile(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Walking => "foot",
        TravelMode::Driving => "car",
    }
}

/// Builds the request URL for a route.
#[must_use]
pub fn route_url(base_url: &str, start: LatLng, end: LatLng, mode: TravelMode) -> String {
    format!(
        "{}/{}/{},{};{},{}?overview=full&geometries=geojson&steps=true",
        base_url.trim_end_matches('/'),
        profile(mode),
        start.lng,
        start.lat,
        end.lng,
        end.lat,
    )
}

/// Route provider backed by an OSRM server.
#[derive(Debug, Clone)]
pub struct OsrmProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a provider sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RouteProvider for OsrmProvider {
    async fn route(
        &self,
        start: LatLng,
        end: LatLng,
        mode: TravelMode,
    ) -> Result<RouteGeometry, RoutingError> {
        let url = route_url(&self.base_url, start, end, mode);
        log::debug!("Requesting {} route: {url}", profile(mode));

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;

        // OSRM reports NoRoute with a 400 status and a JSON body.
        if !status.is_success() && body.get("code").is_none() {
            return Err(RoutingError::Provider {
                message: format!("OSRM returned HTTP {status}"),
            });
        }

        parse_response(body, mode)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    geometry: OsrmGeometry,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    #[serde(default)]
    name: String,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    modifier: Option<String>,
    exit: Option<u32>,
    location: Option<[f64; 2]>,
}

fn from_lng_lat([lng, lat]: [f64; 2]) -> LatLng {
    LatLng::new(lat, lng)
}

impl From<OsrmStep> for Maneuver {
    fn from(step: OsrmStep) -> Self {
        Self {
            kind: step.maneuver.kind,
            modifier: step.maneuver.modifier,
            road: Some(step.name).filter(|n| !n.is_empty()),
            exit: step.maneuver.exit,
            location: step.maneuver.location.map(from_lng_lat),
            distance_m: step.distance,
            duration_s: step.duration,
        }
    }
}

/// Converts an OSRM JSON body into a route geometry.
///
/// # Errors
///
/// * [`RoutingError::NoRoute`] if OSRM found no path.
/// * [`RoutingError::Provider`] for any other error code or malformed body.
pub fn parse_response(body: serde_json::Value, mode: TravelMode) -> Result<RouteGeometry, RoutingError> {
    let resp: OsrmResponse = serde_json::from_value(body).map_err(|e| RoutingError::Provider {
        message: format!("Unreadable OSRM response: {e}"),
    })?;

    match resp.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RoutingError::NoRoute),
        code => {
            return Err(RoutingError::Provider {
                message: resp.message.unwrap_or_else(|| code.to_string()),
            });
        }
    }

    let Some(route) = resp.routes.into_iter().next() else {
        return Err(RoutingError::NoRoute);
    };

    let coordinates: Vec<LatLng> = route
        .geometry
        .coordinates
        .into_iter()
        .map(from_lng_lat)
        .collect();
    if coordinates.len() < 2 {
        return Err(RoutingError::Provider {
            message: format!("Route geometry has {} point(s)", coordinates.len()),
        });
    }

    let maneuvers: Vec<Maneuver> = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(Maneuver::from)
        .collect();

    log::debug!(
        "OSRM route: {:.0} m, {} points, {} maneuvers",
        route.distance,
        coordinates.len(),
        maneuvers.len()
    );

    Ok(RouteGeometry::new(coordinates, route.distance, maneuvers, mode))
}
