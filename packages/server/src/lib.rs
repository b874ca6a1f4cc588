#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for saferoute.
//!
//! Serves the incident dataset (full records and lightweight markers) and
//! a route risk prediction endpoint. The dataset file is re-read on every
//! request so it can be replaced without a restart.

mod handlers;

use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};

/// Default dataset location, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/incidents.json";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// JSON array of incident records.
    pub data_path: PathBuf,
}

impl AppState {
    /// Reads `SAFEROUTE_DATA_PATH`, falling back to [`DEFAULT_DATA_PATH`].
    #[must_use]
    pub fn from_env() -> Self {
        let data_path = std::env::var("SAFEROUTE_DATA_PATH")
            .unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());
        Self {
            data_path: PathBuf::from(data_path),
        }
    }
}

/// Registers all routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root)).service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/incidents", web::get().to(handlers::incidents))
            .route("/incidents/markers", web::get().to(handlers::markers))
            .route("/predict_route_risk", web::post().to(handlers::predict_route_risk)),
    );
}

/// Starts the saferoute API server.
///
/// Binds to `BIND_ADDR` (default `127.0.0.1`) and `PORT` (default
/// `8000`). This is a regular async function; the caller provides the
/// runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let state = web::Data::new(AppState::from_env());
    log::info!("Serving incidents from {}", state.data_path.display());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
