//! Incident dataset loaders.
//!
//! The HTTP loader tries the lightweight marker endpoint first and falls
//! back to the full listing. If both fail the caller gets an empty
//! dataset plus a notice; a missing dataset is never fatal.

use std::path::Path;
use std::time::Duration;

use crate::IncidentError;
use crate::normalize::{NormalizedBatch, normalize_str, normalize_value};

/// Per-request timeout for the incident API.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Marker endpoint path (position-pair shape).
pub const MARKERS_PATH: &str = "/api/incidents/markers";

/// Full listing endpoint path (flat shape).
pub const LIST_PATH: &str = "/api/incidents";

/// Outcome of a dataset load.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    /// Normalized records (empty on failure).
    pub batch: NormalizedBatch,
    /// User-visible notice when the load fell back to an empty dataset.
    pub notice: Option<String>,
}

/// Loads incidents from the incident API at `base_url`.
///
/// Never fails: on error the outcome carries an empty batch and a notice.
pub async fn load_from_api(client: &reqwest::Client, base_url: &str) -> LoadOutcome {
    let base = base_url.trim_end_matches('/');

    match fetch_batch(client, &format!("{base}{MARKERS_PATH}")).await {
        Ok(batch) => return LoadOutcome { batch, notice: None },
        Err(e) => log::warn!("Marker endpoint failed, trying full listing: {e}"),
    }

    match fetch_batch(client, &format!("{base}{LIST_PATH}")).await {
        Ok(batch) => LoadOutcome { batch, notice: None },
        Err(e) => {
            log::error!("Failed to load incidents: {e}");
            LoadOutcome {
                batch: NormalizedBatch::default(),
                notice: Some("Incident data could not be loaded.".to_string()),
            }
        }
    }
}

async fn fetch_batch(client: &reqwest::Client, url: &str) -> Result<NormalizedBatch, IncidentError> {
    log::debug!("GET {url}");
    let body: serde_json::Value = client
        .get(url)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let batch = normalize_value(&body);
    log::info!("Loaded {} incidents from {url}", batch.events.len());
    Ok(batch)
}

/// Loads incidents from a JSON file containing a record array.
///
/// # Errors
///
/// Returns [`IncidentError`] if the file cannot be read or parsed.
pub async fn load_from_file(path: &Path) -> Result<NormalizedBatch, IncidentError> {
    let text = tokio::fs::read_to_string(path).await?;
    let batch = normalize_str(&text)?;
    log::info!(
        "Loaded {} incidents from {} ({} dropped)",
        batch.events.len(),
        path.display(),
        batch.dropped
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_records_from_file() {
        let tmp = std::env::temp_dir().join("saferoute_incident_loader_test.json");
        std::fs::write(
            &tmp,
            r#"[{"lat": 4.6, "lng": -74.08, "tipo": "theft"}, {"lat": "x", "lng": 1}]"#,
        )
        .unwrap();

        let batch = load_from_file(&tmp).await.unwrap();
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.dropped, 1);

        let _ = std::fs::remove_file(&tmp);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("saferoute_incident_loader_missing.json");
        assert!(matches!(
            load_from_file(&missing).await,
            Err(IncidentError::Io(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_api_falls_back_to_empty_with_notice() {
        let client = reqwest::Client::new();
        let outcome = load_from_api(&client, "http://127.0.0.1:9").await;
        assert!(outcome.batch.events.is_empty());
        assert!(outcome.notice.is_some());
    }
}
