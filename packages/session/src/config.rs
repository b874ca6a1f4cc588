//! Session and service configuration.
//!
//! Values come from an optional TOML file; service URLs can then be
//! overridden from the environment.

use std::path::Path;

use saferoute_navigation::ProgressPolicy;
use saferoute_risk::RiskThresholds;
use saferoute_routing_models::TravelMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default base URL of the incident API and risk advisor.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`Config`].
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Tunables of the scoring, cursor, and advisory pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Incidents farther than this from the route are ignored.
    pub proximity_radius_m: f64,
    pub thresholds: RiskThresholds,
    /// Upper bound on polyline points examined per incident.
    pub scoring_max_samples: usize,
    /// Upper bound on polyline points examined per position update.
    pub cursor_max_samples: usize,
    /// Upper bound on route points sent to the advisor.
    pub advisor_max_points: usize,
    /// Comments kept after merging a remote opinion.
    pub advisor_comment_cap: usize,
    pub progress_policy: ProgressPolicy,
    pub default_mode: TravelMode,
    /// Emit speech effects while navigating.
    pub voice: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            proximity_radius_m: saferoute_risk::scorer::DEFAULT_RADIUS_M,
            thresholds: RiskThresholds::default(),
            scoring_max_samples: saferoute_risk::scorer::DEFAULT_MAX_SAMPLES,
            cursor_max_samples: saferoute_navigation::DEFAULT_MAX_SAMPLES,
            advisor_max_points: saferoute_advisor::DEFAULT_MAX_POINTS,
            advisor_comment_cap: 2,
            progress_policy: ProgressPolicy::default(),
            default_mode: TravelMode::default(),
            voice: true,
        }
    }
}

/// External service locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Incident API and risk advisor base URL.
    pub api_url: String,
    /// OSRM `route/v1` base URL.
    pub osrm_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            osrm_url: saferoute_routing::osrm::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Applies `SAFEROUTE_API_URL` and `SAFEROUTE_OSRM_URL` when set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SAFEROUTE_API_URL") {
            self.api_url = url;
        }
        if let Ok(url) = std::env::var("SAFEROUTE_OSRM_URL") {
            self.osrm_url = url;
        }
    }
}

/// Full configuration file.
///
/// ```toml
/// [session]
/// proximity_radius_m = 250.0
/// progress_policy = "non-decreasing"
///
/// [services]
/// api_url = "http://localhost:8000"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub services: ServiceConfig,
}

impl Config {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Loads the file at `path` (defaults if `None`), then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.services.apply_env();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!((config.session.proximity_radius_m - 300.0).abs() < f64::EPSILON);
        assert_eq!(config.session.scoring_max_samples, 800);
        assert_eq!(config.session.cursor_max_samples, 1000);
        assert_eq!(config.session.advisor_max_points, 200);
        assert_eq!(config.session.advisor_comment_cap, 2);
        assert_eq!(config.session.default_mode, TravelMode::Driving);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [session]
            proximity_radius_m = 150.0
            progress_policy = "non-decreasing"
            default_mode = "walking"

            [session.thresholds]
            high_below_m = 50.0

            [services]
            osrm_url = "http://localhost:5000/route/v1"
            "#,
        )
        .unwrap();
        assert!((config.session.proximity_radius_m - 150.0).abs() < f64::EPSILON);
        assert_eq!(config.session.progress_policy, ProgressPolicy::NonDecreasing);
        assert_eq!(config.session.default_mode, TravelMode::Walking);
        assert!((config.session.thresholds.high_below_m - 50.0).abs() < f64::EPSILON);
        assert!((config.session.thresholds.medium_up_to_m - 300.0).abs() < f64::EPSILON);
        assert_eq!(config.services.api_url, DEFAULT_API_URL);
        assert_eq!(config.services.osrm_url, "http://localhost:5000/route/v1");
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(matches!(
            Config::from_toml("[session]\nadvisor_max_points = \"many\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Config::load(Some(Path::new("/nonexistent/saferoute.toml"))),
            Err(ConfigError::Io(_))
        ));
    }
}
