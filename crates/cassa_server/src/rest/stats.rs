//! Statistics and health check endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers
    pub status: String,
    /// Server version
    pub version: String,
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// Store statistics response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Number of named graphs
    pub graph_count: usize,
    /// Time of the last change as an HTTP-date, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// `false` if the store rejects writes
    pub writable: bool,
    /// Base URI graphs are identified under
    pub base_uri: String,
    /// Media types accepted by the feed endpoints
    pub feed_media_types: Vec<String>,
}

/// Store statistics endpoint
///
/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let store = state.store.clone();
    let (graph_count, last_modification) = tokio::task::spawn_blocking(move || {
        Ok::<_, cassa_core::Error>((store.graph_infos()?.count(), store.last_modification()?))
    })
    .await??;

    Ok(Json(StatsResponse {
        graph_count,
        last_modified: cassa_core::dates::to_http_date(last_modification)
            .filter(|_| last_modification != cassa_core::UNKNOWN_MODIFICATION),
        writable: state.store.as_modifiable().is_some(),
        base_uri: state.endpoint.base().to_string(),
        feed_media_types: state
            .feeds
            .media_types()
            .iter()
            .map(ToString::to_string)
            .collect(),
    }))
}
