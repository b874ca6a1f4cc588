//! `assess` subcommand: one route session against live services.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use saferoute_advisor::HttpAdvisor;
use saferoute_geometry::LatLng;
use saferoute_incident::IncidentStore;
use saferoute_incident::loader::{REQUEST_TIMEOUT, load_from_api};
use saferoute_routing::osrm::OsrmProvider;
use saferoute_session::{
    Effect, Notice, PositionSink, PositionSource, RouteSession, ServiceConfig, SessionConfig,
    SessionDriver, SessionSnapshot, TrackingError,
};

/// How long to wait for each replayed position to be applied.
const POSITION_WAIT: Duration = Duration::from_secs(5);

pub struct Request {
    pub from: LatLng,
    pub to: LatLng,
    pub start: bool,
    pub positions: Vec<LatLng>,
    pub locality: Option<String>,
}

/// Replays a fixed list of positions.
struct Replay(Vec<LatLng>);

#[async_trait]
impl PositionSource for Replay {
    async fn watch(&self, sink: PositionSink) -> Result<(), TrackingError> {
        if self.0.is_empty() {
            return Err(TrackingError::Unavailable("no positions given".to_string()));
        }
        for position in &self.0 {
            if !sink.send(*position) {
                break;
            }
        }
        Ok(())
    }
}

/// Runs the session and prints its outcome.
///
/// # Errors
///
/// Returns an error if the HTTP clients cannot be built. Service failures
/// are reported in the output instead.
pub async fn run(
    services: &ServiceConfig,
    config: SessionConfig,
    request: Request,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let outcome = load_from_api(&client, &services.api_url).await;

    let routes = Arc::new(OsrmProvider::with_client(client.clone(), services.osrm_url.clone()));
    let advisor = Arc::new(HttpAdvisor::with_client(client, services.api_url.clone()));
    let positions = Arc::new(Replay(request.positions.clone()));

    let session = RouteSession::new(config, IncidentStore::default());
    let mut driver = SessionDriver::new(session, routes, advisor, positions);
    let mut effects = driver.subscribe();

    driver.dispatch(|s| s.incidents_loaded(outcome));
    if let Some(locality) = &request.locality {
        driver.dispatch(|s| s.set_locality_filter(locality));
    }
    driver.dispatch(|s| s.set_start(Some(request.from)));
    driver.dispatch(|s| s.set_end(Some(request.to)));
    driver.settle().await;

    if request.start {
        driver.dispatch(RouteSession::confirm_start);
        driver.settle().await;

        if !request.positions.is_empty() {
            driver.dispatch(RouteSession::toggle_tracking);
            for _ in &request.positions {
                if tokio::time::timeout(POSITION_WAIT, driver.step()).await.is_err() {
                    log::warn!("Timed out waiting for a position update");
                    break;
                }
            }
        }
    }

    while let Ok(effect) = effects.try_recv() {
        print_effect(&effect);
    }
    print_snapshot(&driver.session().snapshot());

    Ok(())
}

fn print_effect(effect: &Effect) {
    match effect {
        Effect::Notice(Notice::DatasetUnavailable(message)) => println!("! {message}"),
        Effect::Notice(Notice::RouteUnavailable(message)) => println!("! Route unavailable: {message}"),
        Effect::Notice(Notice::TrackingUnavailable(message)) => println!("! Tracking unavailable: {message}"),
        Effect::Alert { tier, advice } => println!("ALERT ({tier}): {advice}"),
        Effect::Speak(text) => println!("[voice] {text}"),
        Effect::InstructionChanged { index, text } => println!("-> [{index}] {text}"),
        _ => {}
    }
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!();
    println!("Phase:    {}", snapshot.phase);
    println!("Mode:     {}", snapshot.mode);
    if let Some(route) = &snapshot.route {
        println!(
            "Route:    {} / {} ({} points)",
            route.distance_text, route.time_text, route.point_count
        );
    }

    match snapshot.assessment.tier {
        Some(tier) => println!("Risk:     {}", tier.label()),
        None => println!("Risk:     (no route)"),
    }
    for comment in &snapshot.assessment.comments {
        println!("          {}", comment.text);
    }
    if let Some(advice) = &snapshot.advice {
        println!("Advice:   {advice}");
    }
    if !snapshot.corridor.is_empty() {
        println!("Corridor: {} route points near incidents", snapshot.corridor.len());
    }

    if !snapshot.instructions.is_empty() {
        println!();
        for instruction in &snapshot.instructions {
            let marker = if instruction.index == snapshot.instruction_index {
                ">"
            } else {
                " "
            };
            println!("{marker} {:>2}. {}", instruction.index + 1, instruction.text);
        }
    }
}
