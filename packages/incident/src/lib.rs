#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident dataset loading and storage.
//!
//! Raw records arrive from the incident API (or a JSON file) in one of two
//! shapes and are normalized into [`IncidentEvent`]s by [`normalize`].
//! Records without finite coordinates are dropped at load time. The
//! resulting set lives in an [`IncidentStore`], which is the only thing
//! allowed to mutate it; scorers read filtered views.

pub mod loader;
pub mod normalize;
pub mod store;

pub use saferoute_incident_models::{IncidentEvent, IncidentFilter};
pub use store::IncidentStore;

/// Errors that can occur while loading incident data.
#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload was not a list of records.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}
