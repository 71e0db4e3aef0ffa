//! HTTP routes of the graph store.
//!
//! ## Graphs
//!
//! - `GET|HEAD|PUT|POST|DELETE|PATCH /g/{*path}` - graph identified by its URI
//!   under `{base}g/`
//! - `GET|HEAD|PUT|POST|DELETE|PATCH /service?graph={uri}` - any graph
//! - `... /service?default` - the default graph
//! - `POST /service` - create a graph with a server-minted URI
//!
//! ## Feeds
//!
//! - `GET /feeds` - SDShare collection feed
//! - `GET /feeds/fragments?graph=|default[&since=millis]` - fragments feed
//! - `GET /feeds/snapshots?graph=|default` - snapshots feed
//!
//! ## Service
//!
//! - `GET /health`
//! - `GET /stats`

pub mod feeds;
pub mod graphs;
mod stats;

pub use feeds::FeedParams;
pub use graphs::{GraphParams, ServiceParams};
pub use stats::*;

use crate::state::AppState;
use axum::{routing::get, Router};

/// Creates the router for all graph store routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/g/{*path}",
            get(graphs::direct_graph)
                .head(graphs::direct_graph)
                .put(graphs::direct_graph)
                .post(graphs::direct_graph)
                .delete(graphs::direct_graph)
                .patch(graphs::direct_graph),
        )
        .route(
            "/service",
            get(graphs::service_graph)
                .head(graphs::service_graph)
                .put(graphs::service_graph)
                .post(graphs::service_graph)
                .delete(graphs::service_graph)
                .patch(graphs::service_graph),
        )
        .route("/feeds", get(feeds::collection_feed))
        .route("/feeds/fragments", get(feeds::fragments_feed))
        .route("/feeds/snapshots", get(feeds::snapshots_feed))
        .route("/health", get(stats::health_check))
        .route("/stats", get(stats::get_stats))
}
