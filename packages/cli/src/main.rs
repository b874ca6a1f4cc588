#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for saferoute.
//!
//! `serve` runs the API server, `incidents` summarizes the dataset served
//! by the API, and `assess` drives a full route session (preview, and
//! optionally navigation) against the live routing and advisor services.

mod assess;

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use saferoute_geometry::LatLng;
use saferoute_incident::loader::{REQUEST_TIMEOUT, load_from_api};
use saferoute_incident_models::IncidentFilter;
use saferoute_routing_models::TravelMode;
use saferoute_session::Config;

#[derive(Parser)]
#[command(name = "saferoute_cli", about = "Risk-aware routing toolchain")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the incident and risk API server
    Serve,
    /// Load the incident dataset from the API and print a summary
    Incidents {
        /// Category label (case-insensitive)
        #[arg(long)]
        category: Option<String>,
        /// Locality substring (case-insensitive)
        #[arg(long)]
        locality: Option<String>,
        /// Period label (case-insensitive)
        #[arg(long)]
        period: Option<String>,
    },
    /// Preview a route and report its risk
    Assess {
        /// Start coordinate as `LAT,LNG`
        #[arg(long, value_parser = parse_lat_lng)]
        from: LatLng,
        /// End coordinate as `LAT,LNG`
        #[arg(long, value_parser = parse_lat_lng)]
        to: LatLng,
        /// Travel mode (`walking` or `driving`)
        #[arg(long)]
        mode: Option<TravelMode>,
        /// Proximity radius in meters
        #[arg(long)]
        radius: Option<f64>,
        /// Confirm the route and start navigating
        #[arg(long)]
        start: bool,
        /// Live positions to replay while navigating, as `LAT,LNG`
        #[arg(long = "at", value_parser = parse_lat_lng, requires = "start")]
        positions: Vec<LatLng>,
        /// Locality substring applied to the incident set
        #[arg(long)]
        locality: Option<String>,
    },
}

/// Parses `"LAT,LNG"`.
fn parse_lat_lng(s: &str) -> Result<LatLng, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got {s:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("invalid latitude: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("invalid longitude: {e}"))?;
    let point = LatLng::new(lat, lng);
    if !point.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(format!("coordinate out of range: {s}"));
    }
    Ok(point)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            // The server uses actix-web's runtime, so it runs in a blocking
            // task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(saferoute_server::run_server())
            })
            .await??;
        }
        Commands::Incidents {
            category,
            locality,
            period,
        } => {
            let filter = IncidentFilter {
                category,
                locality,
                period,
            };
            incidents(&config, &filter).await?;
        }
        Commands::Assess {
            from,
            to,
            mode,
            radius,
            start,
            positions,
            locality,
        } => {
            let mut session = config.session.clone();
            if let Some(mode) = mode {
                session.default_mode = mode;
            }
            if let Some(radius) = radius {
                session.proximity_radius_m = radius;
            }
            let request = assess::Request {
                from,
                to,
                start,
                positions,
                locality,
            };
            assess::run(&config.services, session, request).await?;
        }
    }

    Ok(())
}

async fn incidents(config: &Config, filter: &IncidentFilter) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let outcome = load_from_api(&client, &config.services.api_url).await;

    if let Some(notice) = &outcome.notice {
        println!("{notice}");
    }

    let matching: Vec<_> = outcome
        .batch
        .events
        .iter()
        .filter(|e| filter.matches_contains(e))
        .collect();

    let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &matching {
        *by_category.entry(event.category.as_str()).or_default() += 1;
    }

    println!(
        "{} incidents loaded, {} dropped, {} matching",
        outcome.batch.events.len(),
        outcome.batch.dropped,
        matching.len()
    );
    println!("{:<30} COUNT", "CATEGORY");
    println!("{}", "-".repeat(40));
    for (category, count) in by_category {
        println!("{category:<30} {count}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates() {
        let p = parse_lat_lng("4.60, -74.08").unwrap();
        assert!((p.lat - 4.60).abs() < f64::EPSILON);
        assert!((p.lng - -74.08).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_bad_coordinates() {
        assert!(parse_lat_lng("4.60").is_err());
        assert!(parse_lat_lng("abc,1").is_err());
        assert!(parse_lat_lng("91,0").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_assess_arguments() {
        let cli = Cli::try_parse_from([
            "saferoute_cli",
            "assess",
            "--from",
            "4.6,-74.08",
            "--to",
            "4.61,-74.07",
            "--mode",
            "walk",
            "--start",
            "--at",
            "4.605,-74.075",
        ])
        .unwrap();
        match cli.command {
            Commands::Assess {
                mode,
                start,
                positions,
                ..
            } => {
                assert_eq!(mode, Some(TravelMode::Walking));
                assert!(start);
                assert_eq!(positions.len(), 1);
            }
            _ => panic!("expected assess"),
        }
    }
}
