//! # Cassa Server - Graph Store over HTTP
//!
//! Serves the graphs of a [`cassa_core::Store`] through the graph store
//! protocol and publishes their changes as SDShare feeds.
//!
//! ## Features
//!
//! - **Graph resources**: GET, HEAD, PUT, POST, DELETE and PATCH on graphs
//!   identified directly (`/g/...`) or indirectly (`/service?graph=...`)
//! - **Content negotiation**: `Accept` against the media types each graph
//!   can be served in; `Vary: Accept` on negotiated responses
//! - **Conditional GET**: `ETag` / `Last-Modified` validators with
//!   `If-None-Match` / `If-Modified-Since`
//! - **SDShare feeds**: collection, fragments and snapshots feeds as Atom or
//!   JSON
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Cassa Server                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌──────────────────┐                 │
//! │  │   /g/*, /service │  │   /feeds/*       │                 │
//! │  └────────┬─────────┘  └────────┬─────────┘                 │
//! │           │                     │                            │
//! │  ┌────────▼─────────┐  ┌───────▼──────────┐                 │
//! │  │  GraphProtocol   │  │  FeedProducer    │                 │
//! │  └────────┬─────────┘  └───────┬──────────┘                 │
//! │           │                     │                            │
//! │  ┌────────▼─────────────────────▼─────────┐                 │
//! │  │        cassa_core::Store (Arc<dyn>)     │                 │
//! │  └─────────────────────────────────────────┘                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cassa_server::{CassaConfig, CassaServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CassaConfig::default()
//!         .with_port(3030)
//!         .with_tag_domain("example.org");
//!     CassaServer::new(config)?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Create or replace a graph
//! curl -X PUT http://localhost:8080/g/people \
//!   -H "Content-Type: application/n-triples" \
//!   --data-binary '<http://ex.org/alice> <http://ex.org/knows> <http://ex.org/bob> .'
//!
//! # Read it back
//! curl -H "Accept: application/n-triples" http://localhost:8080/g/people
//!
//! # Follow its changes
//! curl -H "Accept: application/atom+xml" \
//!   "http://localhost:8080/feeds/fragments?graph=http%3A%2F%2Flocalhost%3A8080%2Fg%2Fpeople"
//! ```

pub mod error;
pub mod rest;
pub mod server;
pub mod state;

pub use error::{Error, Result};
pub use server::{CassaConfig, CassaServer};
pub use state::AppState;

/// Version of the Cassa server.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
