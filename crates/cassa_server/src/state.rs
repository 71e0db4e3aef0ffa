//! The shared application state for the Cassa server.

use crate::error::Result;
use crate::server::CassaConfig;
use cassa_core::{
    FeedProducer, FeedWriterRegistry, GraphProtocol, MemoryStore, ServiceEndpoint, Store,
    SyntaxRegistry, TagUriGenerator,
};
use std::sync::Arc;

/// The state shared by all handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// The graph store backend.
    pub store: Arc<dyn Store>,
    /// The syntaxes request bodies are validated against.
    pub syntaxes: Arc<SyntaxRegistry>,
    /// The feed formats clients can negotiate.
    pub feeds: Arc<FeedWriterRegistry>,
    /// Where graphs and feeds live.
    pub endpoint: ServiceEndpoint,
    /// Mints feed and entry ids.
    pub tags: Arc<TagUriGenerator>,
    /// Title of the collection feed.
    pub title: Arc<str>,
    /// The graph resource protocol over `store`.
    pub protocol: GraphProtocol,
}

impl AppState {
    /// Creates the state for `config` over an existing store.
    pub fn with_store(config: &CassaConfig, store: Arc<dyn Store>) -> Result<Self> {
        let endpoint = ServiceEndpoint::new(config.base_uri())?;
        let syntaxes = Arc::new(SyntaxRegistry::standard());
        let tags = TagUriGenerator::new(config.tag_domain.clone())?;
        let protocol = GraphProtocol::new(store.clone(), endpoint.clone(), syntaxes.clone());

        Ok(Self {
            store,
            syntaxes,
            feeds: Arc::new(FeedWriterRegistry::standard()),
            endpoint,
            tags: Arc::new(tags),
            title: Arc::from(config.title.as_str()),
            protocol,
        })
    }

    /// Creates the state for `config` over a fresh in-memory store.
    pub fn in_memory(config: &CassaConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// A feed producer over this state's store.
    pub fn feed_producer(&self) -> FeedProducer<'_> {
        FeedProducer::new(&*self.store, &self.endpoint, &self.tags, &self.title)
    }
}
