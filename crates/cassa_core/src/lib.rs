//! Cassa Core - Graph Store Protocol Engine
//!
//! The transport-independent half of the Cassa graph store server: it
//! decides what an HTTP request against a graph means, which store
//! operation runs, and what the response looks like. The HTTP binding lives
//! in `cassa_server`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Cassa Core                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐ │
//! │  │   GraphProtocol          │  │   SDShare FeedProducer   │ │
//! │  │   GET/HEAD/PUT/POST/...  │  │   collection/fragments/  │ │
//! │  │                          │  │   snapshots              │ │
//! │  └────────────┬─────────────┘  └────────────┬─────────────┘ │
//! │               │                             │                │
//! │  ┌────────────▼─────────────┐  ┌────────────▼─────────────┐ │
//! │  │ negotiation, conditional │  │ FeedHandler: Atom / JSON │ │
//! │  │ etag, media types        │  │ tag URIs                 │ │
//! │  └────────────┬─────────────┘  └──────────────────────────┘ │
//! │               │                                              │
//! │  ┌────────────▼─────────────────────────────────────────┐   │
//! │  │   Store / ModifiableStore (backends::MemoryStore)     │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use cassa_core::prelude::*;
//! use std::sync::Arc;
//!
//! let protocol = GraphProtocol::new(
//!     Arc::new(MemoryStore::new()),
//!     ServiceEndpoint::new("http://localhost:8080/")?,
//!     Arc::new(SyntaxRegistry::standard()),
//! );
//!
//! let put = ProtocolRequest::new(Method::Put, Some(GraphRef::named("http://localhost:8080/g/people")))
//!     .with_content_type(known::n_triples())
//!     .with_body("<http://ex.org/alice> <http://ex.org/knows> <http://ex.org/bob> .");
//! assert_eq!(protocol.handle(put)?.status_code(), 201);
//!
//! let get = ProtocolRequest::new(Method::Get, Some(GraphRef::named("http://localhost:8080/g/people")));
//! assert_eq!(protocol.handle(get)?.status_code(), 200);
//! # Ok::<(), cassa_core::Error>(())
//! ```

pub mod backends;
pub mod conditional;
pub mod dates;
pub mod error;
pub mod etag;
pub mod feed;
pub mod graph;
pub mod media_type;
pub mod negotiation;
pub mod protocol;
pub mod sdshare;
pub mod store;
pub mod syntax;
pub mod tag;

// Re-exports
pub use conditional::Preconditions;
pub use error::{Error, Result};
pub use etag::generate_etag;
pub use feed::{FeedHandler, FeedWriterFactory, FeedWriterRegistry};
pub use graph::{
    FragmentInfo, GraphInfo, GraphRef, RemovalStatus, Resource, ResourceRole,
    UNKNOWN_MODIFICATION,
};
pub use media_type::MediaType;
pub use negotiation::{negotiate, AcceptList, Negotiated};
pub use protocol::{GraphProtocol, Method, Outcome, ProtocolRequest, ServiceEndpoint, Validators};
pub use sdshare::FeedProducer;
pub use store::{GraphRepresentation, ModifiableStore, Store, Stored};
pub use syntax::{Syntax, SyntaxRegistry};
pub use tag::{TagKind, TagUriGenerator};

#[cfg(feature = "memory-backend")]
pub use backends::MemoryStore;

/// Version of the Cassa core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types.
pub mod prelude {
    pub use crate::media_type::known;
    pub use crate::{
        AcceptList, Error, GraphInfo, GraphProtocol, GraphRef, MediaType, Method,
        ModifiableStore, Outcome, Preconditions, ProtocolRequest, Result, ServiceEndpoint,
        Store, SyntaxRegistry,
    };

    #[cfg(feature = "memory-backend")]
    pub use crate::MemoryStore;
}
