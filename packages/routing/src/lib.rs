#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Routing provider abstraction.
//!
//! Path-finding is delegated to an external service behind the
//! [`RouteProvider`] trait. [`osrm::OsrmProvider`] talks to an OSRM
//! `route/v1` endpoint; [`grammar`] turns raw maneuvers into
//! human-readable instructions.

pub mod grammar;
pub mod osrm;

use async_trait::async_trait;
use saferoute_geometry::LatLng;
use saferoute_routing_models::{RouteGeometry, TravelMode};
use thiserror::Error;

/// Instruction text shown when no route could be computed.
pub const ROUTE_UNAVAILABLE: &str = "The route could not be computed.";

/// Errors that can occur while requesting a route.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error or an unreadable payload.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider found no path between the endpoints.
    #[error("No route between the given endpoints")]
    NoRoute,
}

/// An external path-finding service.
///
/// Implementations must be cancel-safe: the session drops in-flight
/// requests whose endpoints have since changed.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Computes a route between two coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the provider cannot compute a path.
    async fn route(
        &self,
        start: LatLng,
        end: LatLng,
        mode: TravelMode,
    ) -> Result<RouteGeometry, RoutingError>;
}
