//! HTTP handler functions for the saferoute API.

use actix_web::{HttpResponse, web};
use saferoute_incident::loader::load_from_file;
use saferoute_incident_models::{IncidentEvent, IncidentFilter};
use saferoute_server_models::{
    ApiHealth, ApiIncident, ApiMarker, ApiRiskPrediction, ApiRoot, IncidentQueryParams,
    RoutePointsRequest,
};

use crate::AppState;

/// Loads the dataset and applies `filter`. A failed load yields an empty
/// list.
async fn load_filtered(state: &AppState, filter: &IncidentFilter) -> Vec<IncidentEvent> {
    match load_from_file(&state.data_path).await {
        Ok(batch) => batch
            .events
            .into_iter()
            .filter(|e| filter.matches_exact(e))
            .collect(),
        Err(e) => {
            log::error!("Failed to load {}: {e}", state.data_path.display());
            Vec::new()
        }
    }
}

/// `GET /`
pub async fn root(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiRoot {
        message: "saferoute incident API".to_string(),
        data_path: state.data_path.display().to_string(),
    })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/incidents`
///
/// Full records, filtered by category, locality and period.
pub async fn incidents(
    state: web::Data<AppState>,
    params: web::Query<IncidentQueryParams>,
) -> HttpResponse {
    let filter = IncidentFilter::from(params.into_inner());
    let records: Vec<ApiIncident> = load_filtered(&state, &filter)
        .await
        .into_iter()
        .map(ApiIncident::from)
        .collect();
    HttpResponse::Ok().json(records)
}

/// `GET /api/incidents/markers`
///
/// Marker-shaped records, filtered by category and period.
pub async fn markers(
    state: web::Data<AppState>,
    params: web::Query<IncidentQueryParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let filter = IncidentFilter {
        category: params.category,
        locality: None,
        period: params.period,
    };
    let markers: Vec<ApiMarker> = load_filtered(&state, &filter)
        .await
        .into_iter()
        .map(ApiMarker::from)
        .collect();
    HttpResponse::Ok().json(markers)
}

/// `POST /api/predict_route_risk`
pub async fn predict_route_risk(body: web::Json<RoutePointsRequest>) -> HttpResponse {
    let count = body.points.len();
    log::debug!("Predicting risk for {count} route points");
    HttpResponse::Ok().json(ApiRiskPrediction::from_point_count(count))
}
