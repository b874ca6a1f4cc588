#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk-aware route session.
//!
//! [`RouteSession`] is a synchronous state machine: endpoint changes,
//! confirmations, provider responses and live positions go in, and
//! [`Effect`]s come out. It performs no I/O. [`SessionDriver`] executes
//! those effects on tokio against a [`RouteProvider`](saferoute_routing::RouteProvider),
//! a [`RiskAdvisor`](saferoute_advisor::RiskAdvisor) and a
//! [`PositionSource`], and feeds the results back in.
//!
//! Every outbound request is tagged with a [`Generation`]. Changing
//! endpoints, mode, or phase bumps the generation, and responses carrying
//! an older tag are discarded on arrival.

pub mod config;
pub mod driver;
pub mod effects;
pub mod pipeline;
pub mod session;

pub use config::{Config, ConfigError, ServiceConfig, SessionConfig};
pub use driver::{PositionSink, PositionSource, SessionDriver};
pub use effects::{Effect, Generation, Notice, Phase, PipelineKind};
pub use pipeline::RiskPipeline;
pub use session::{RouteSession, SessionSnapshot};

use thiserror::Error;

/// Errors reported by a live position source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    /// No position source is available on this device.
    #[error("Position source unavailable: {0}")]
    Unavailable(String),

    /// The user or platform denied access to the position.
    #[error("Position access denied")]
    Denied,
}
