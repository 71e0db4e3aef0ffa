//! The Cassa HTTP server.

use crate::error::Result;
use crate::rest;
use crate::state::AppState;

use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Configuration for the `CassaServer`.
#[derive(Debug, Clone)]
pub struct CassaConfig {
    /// The host address to bind the server to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// The public base URI graphs are identified under. Derived from host
    /// and port when `None`.
    pub base_uri: Option<String>,
    /// The authority used in feed tag URIs.
    pub tag_domain: String,
    /// If `true`, Cross-Origin Resource Sharing (CORS) headers will be enabled.
    pub cors_enabled: bool,
    /// If `true`, HTTP request tracing will be enabled.
    pub tracing: bool,
    /// Title of the collection feed.
    pub title: String,
}

impl Default for CassaConfig {
    /// Returns a default configuration suitable for local development.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_uri: None,
            tag_domain: "localhost.localdomain".to_string(),
            cors_enabled: true,
            tracing: true,
            title: "Cassa Graph Store".to_string(),
        }
    }
}

impl CassaConfig {
    /// Returns a configuration that binds to all network interfaces.
    pub fn public() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn with_tag_domain(mut self, domain: impl Into<String>) -> Self {
        self.tag_domain = domain.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// The effective base URI.
    pub fn base_uri(&self) -> String {
        match &self.base_uri {
            Some(uri) => uri.clone(),
            None => format!("http://{}:{}/", self.host, self.port),
        }
    }
}

/// The Cassa graph store server.
pub struct CassaServer {
    config: CassaConfig,
    state: AppState,
}

impl CassaServer {
    /// Creates a server over a fresh in-memory store.
    pub fn new(config: CassaConfig) -> Result<Self> {
        let state = AppState::in_memory(&config)?;
        Ok(Self { config, state })
    }

    /// Creates a server over a pre-built `AppState`.
    pub fn with_state(config: CassaConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Builds the `axum` router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let app: Router<AppState> = Router::new().merge(rest::router());
        let app = app.with_state(self.state.clone());

        let app = if self.config.cors_enabled {
            app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            app
        };

        if self.config.tracing {
            app.layer(TraceLayer::new_for_http())
        } else {
            app
        }
    }

    fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| crate::error::Error::Internal(format!("Invalid address: {}", e)))
    }

    /// Runs the server indefinitely.
    pub async fn run(self) -> Result<()> {
        let addr = self.socket_addr()?;
        let router = self.build_router();

        info!("Starting Cassa server on http://{}", addr);
        info!("Graphs: {}g/", self.state.endpoint.base());
        info!("Feeds: {}", self.state.endpoint.collection_feed_uri());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Runs the server until `shutdown_signal` completes.
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.socket_addr()?;
        let router = self.build_router();

        info!("Starting Cassa server on http://{}", addr);
        info!("Base URI: {}", self.state.endpoint.base());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        info!("Cassa server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CassaConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.cors_enabled);
        assert_eq!(config.base_uri(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_config_public() {
        let config = CassaConfig::public();
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_config_builders() {
        let config = CassaConfig::default()
            .with_host("example.org")
            .with_port(9000)
            .with_tag_domain("example.org")
            .with_title("Graphs");
        assert_eq!(config.base_uri(), "http://example.org:9000/");
        assert_eq!(config.tag_domain, "example.org");

        let config = config.with_base_uri("https://data.example.org/");
        assert_eq!(config.base_uri(), "https://data.example.org/");
    }

    #[test]
    fn test_server_creation() {
        let server = CassaServer::new(CassaConfig::default()).unwrap();
        assert_eq!(server.state().endpoint.base(), "http://127.0.0.1:8080/");
        let _router = server.build_router();
    }

    #[test]
    fn test_invalid_tag_domain() {
        let config = CassaConfig::default().with_tag_domain("not a domain");
        assert!(CassaServer::new(config).is_err());
    }
}
