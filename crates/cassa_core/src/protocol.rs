//! Graph Store Protocol engine.
//!
//! [`GraphProtocol`] maps an HTTP-level [`ProtocolRequest`] to store
//! operations and returns an [`Outcome`]. It knows nothing about a concrete
//! HTTP library; the server crate translates requests and outcomes.
//!
//! # Identification
//!
//! Graphs whose URI lies under the graph namespace are addressed directly
//! (`{base}g/{path}`), any other graph indirectly through
//! `{base}service?graph={uri}`. The default graph is `{base}service?default`.

use crate::conditional::Preconditions;
use crate::error::{Error, Result};
use crate::etag::generate_etag;
use crate::graph::{GraphInfo, GraphRef, RemovalStatus, UNKNOWN_MODIFICATION};
use crate::media_type::MediaType;
use crate::negotiation::{negotiate, AcceptList, Negotiated};
use crate::store::{GraphRepresentation, Store};
use crate::syntax::SyntaxRegistry;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use url::form_urlencoded;

/// The public URI space of one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    base: String,
}

impl ServiceEndpoint {
    /// Creates an endpoint rooted at `base`; a trailing slash is added if
    /// missing.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalArgument`] if `base` is not an absolute URI.
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let mut base = base.into();
        url::Url::parse(&base)
            .map_err(|e| Error::IllegalArgument(format!("invalid base URI {:?}: {}", base, e)))?;
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `{base}service`, the indirect identification resource.
    pub fn service_uri(&self) -> String {
        format!("{}service", self.base)
    }

    /// Namespace under which new graphs are minted.
    pub fn graph_namespace(&self) -> String {
        format!("{}g/", self.base)
    }

    /// Maps the path of a `/g/{path}` request to its graph URI.
    pub fn resolve_path(&self, path: &str) -> String {
        format!("{}{}", self.graph_namespace(), path.trim_start_matches('/'))
    }

    /// The URI clients use to reach `graph` on this endpoint.
    pub fn link_for(&self, graph: &GraphRef) -> String {
        match graph {
            GraphRef::Named(uri) if self.is_direct(uri) => uri.clone(),
            GraphRef::Named(uri) => format!("{}?graph={}", self.service_uri(), encode(uri)),
            GraphRef::Default => format!("{}?default", self.service_uri()),
        }
    }

    /// `true` if `uri` is reachable as `{base}g/{path}`: a non-empty path
    /// that a request path reproduces unchanged.
    fn is_direct(&self, uri: &str) -> bool {
        match uri.strip_prefix(&self.graph_namespace()) {
            Some(path) => {
                !path.is_empty() && !path.starts_with('/') && path.chars().all(is_path_char)
            }
            None => false,
        }
    }

    /// The URI that identifies `graph` itself. The default graph has none
    /// of its own and borrows the service URI.
    pub fn identity_of(&self, graph: &GraphRef) -> String {
        match graph {
            GraphRef::Named(uri) => uri.clone(),
            GraphRef::Default => self.service_uri(),
        }
    }

    pub fn collection_feed_uri(&self) -> String {
        format!("{}feeds", self.base)
    }

    pub fn fragments_feed_uri(&self, graph: &GraphRef) -> String {
        format!("{}feeds/fragments?{}", self.base, graph_query(graph))
    }

    pub fn snapshots_feed_uri(&self, graph: &GraphRef) -> String {
        format!("{}feeds/snapshots?{}", self.base, graph_query(graph))
    }
}

// RFC 3986 pchar and '/', without percent-encoded octets
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.' | '_' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '='
                | ':' | '@' | '/'
        )
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn graph_query(graph: &GraphRef) -> String {
    match graph {
        GraphRef::Named(uri) => format!("graph={}", encode(uri)),
        GraphRef::Default => "default".to_string(),
    }
}

/// The HTTP methods the protocol understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }

    /// `true` for methods that change the store.
    pub fn is_write(&self) -> bool {
        !matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            other => Err(Error::IllegalArgument(format!("unsupported method: {}", other))),
        }
    }
}

/// One request against a graph resource.
#[derive(Debug, Clone)]
pub struct ProtocolRequest {
    pub method: Method,
    /// `None` only for a POST to the service resource.
    pub target: Option<GraphRef>,
    pub subject: Option<String>,
    pub accept: AcceptList,
    pub content_type: Option<MediaType>,
    pub preconditions: Preconditions,
    pub body: Vec<u8>,
}

impl ProtocolRequest {
    pub fn new(method: Method, target: Option<GraphRef>) -> Self {
        Self {
            method,
            target,
            subject: None,
            accept: AcceptList::any(),
            content_type: None,
            preconditions: Preconditions::none(),
            body: Vec::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_accept(mut self, accept: AcceptList) -> Self {
        self.accept = accept;
        self
    }

    pub fn with_content_type(mut self, content_type: MediaType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_preconditions(mut self, preconditions: Preconditions) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Cache validators of a representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    /// Unquoted entity tag.
    pub etag: Option<String>,
    /// Epoch milliseconds; `None` if unknown.
    pub last_modified: Option<i64>,
}

/// The result of a protocol call.
#[derive(Debug)]
pub enum Outcome {
    /// 200. The representation is `None` for HEAD.
    Ok {
        media_type: MediaType,
        representation: Option<GraphRepresentation>,
        validators: Validators,
    },
    /// 304.
    NotModified { validators: Validators },
    /// 201.
    Created { location: String, info: GraphInfo },
    /// 204.
    NoContent,
    /// 202, the removal completes later.
    Accepted,
    /// 406 with the types the graph can be served in.
    NotAcceptable { supported: Vec<MediaType> },
    /// 400 for a rejected but well-formed request.
    BadRequest { reason: String },
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Ok { .. } => 200,
            Outcome::NotModified { .. } => 304,
            Outcome::Created { .. } => 201,
            Outcome::NoContent => 204,
            Outcome::Accepted => 202,
            Outcome::NotAcceptable { .. } => 406,
            Outcome::BadRequest { .. } => 400,
        }
    }

    /// `true` if the response depends on the `Accept` header.
    pub fn varies_on_accept(&self) -> bool {
        matches!(
            self,
            Outcome::Ok { .. } | Outcome::NotModified { .. } | Outcome::NotAcceptable { .. }
        )
    }
}

impl From<RemovalStatus> for Outcome {
    fn from(status: RemovalStatus) -> Self {
        match status {
            RemovalStatus::Immediately => Outcome::NoContent,
            RemovalStatus::Delayed => Outcome::Accepted,
        }
    }
}

/// Dispatches protocol requests to a store.
#[derive(Clone)]
pub struct GraphProtocol {
    store: Arc<dyn Store>,
    endpoint: ServiceEndpoint,
    syntaxes: Arc<SyntaxRegistry>,
}

impl GraphProtocol {
    pub fn new(store: Arc<dyn Store>, endpoint: ServiceEndpoint, syntaxes: Arc<SyntaxRegistry>) -> Self {
        Self {
            store,
            endpoint,
            syntaxes,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub fn syntaxes(&self) -> &SyntaxRegistry {
        &self.syntaxes
    }

    /// Executes `request`.
    ///
    /// Failures the client can correct are returned as [`Outcome`] values
    /// where the protocol defines one; everything else is an [`Error`].
    pub fn handle(&self, request: ProtocolRequest) -> Result<Outcome> {
        match request.method {
            Method::Get => self.read(&request, true),
            Method::Head => self.read(&request, false),
            Method::Put => self.put(&request),
            Method::Post => self.post(&request),
            Method::Delete => self.delete(&request),
            Method::Patch => self.patch(&request),
        }
    }

    fn read(&self, request: &ProtocolRequest, with_body: bool) -> Result<Outcome> {
        let graph = require_target(request)?;
        let info = self.store.graph_info(graph)?;
        let media_type = match negotiate(&request.accept, info.supported_media_types()) {
            Negotiated::Selected(mt) => mt,
            Negotiated::NotAcceptable(supported) => {
                return Ok(Outcome::NotAcceptable { supported })
            }
        };

        let last_modification = info.last_modification();
        let validators = Validators {
            etag: generate_etag(
                &self.endpoint.identity_of(graph),
                last_modification,
                Some(&media_type),
            ),
            last_modified: (last_modification != UNKNOWN_MODIFICATION).then_some(last_modification),
        };
        if request
            .preconditions
            .is_not_modified(validators.etag.as_deref(), last_modification)
        {
            return Ok(Outcome::NotModified { validators });
        }

        let representation = if with_body {
            Some(self.store.graph(graph, &media_type)?)
        } else {
            None
        };
        Ok(Outcome::Ok {
            media_type,
            representation,
            validators,
        })
    }

    fn put(&self, request: &ProtocolRequest) -> Result<Outcome> {
        let store = self.store.require_modifiable()?;
        let graph = require_target(request)?;
        let media_type = self.content_type(request)?;
        let base = self.endpoint.identity_of(graph);
        let mut body = request.body.as_slice();

        if let Some(subject) = &request.subject {
            store.create_or_replace_subject(graph, subject, &mut body, Some(base.as_str()), media_type)?;
            log::debug!("replaced subject {} in {}", subject, graph);
            return Ok(Outcome::NoContent);
        }

        let stored =
            store.create_or_replace_graph(graph, &mut body, Some(base.as_str()), media_type)?;
        log::debug!("{} {}", if stored.created { "created" } else { "replaced" }, graph);
        if stored.created {
            Ok(Outcome::Created {
                location: self.endpoint.link_for(graph),
                info: stored.info,
            })
        } else {
            Ok(Outcome::NoContent)
        }
    }

    fn post(&self, request: &ProtocolRequest) -> Result<Outcome> {
        let store = self.store.require_modifiable()?;
        let media_type = self.content_type(request)?;
        let mut body = request.body.as_slice();

        match &request.target {
            None => {
                let info = store.create_graph(&mut body, &self.endpoint.graph_namespace(), media_type)?;
                log::debug!("created {}", info.graph());
                Ok(Outcome::Created {
                    location: self.endpoint.link_for(info.graph()),
                    info,
                })
            }
            Some(graph) => {
                let base = self.endpoint.identity_of(graph);
                if store.contains_graph(graph)? {
                    store.update_graph(graph, &mut body, Some(base.as_str()), media_type)?;
                } else {
                    store.create_or_replace_graph(graph, &mut body, Some(base.as_str()), media_type)?;
                }
                log::debug!("merged into {}", graph);
                Ok(Outcome::NoContent)
            }
        }
    }

    fn delete(&self, request: &ProtocolRequest) -> Result<Outcome> {
        let store = self.store.require_modifiable()?;
        let graph = require_target(request)?;
        let status = match &request.subject {
            Some(subject) => store.delete_subject(graph, subject)?,
            None => store.delete_graph(graph)?,
        };
        log::debug!("deleted {} ({:?})", graph, status);
        Ok(status.into())
    }

    fn patch(&self, request: &ProtocolRequest) -> Result<Outcome> {
        let store = self.store.require_modifiable()?;
        let graph = require_target(request)?;
        let media_type = self.content_type(request)?;
        let base = self.endpoint.identity_of(graph);
        let mut body = request.body.as_slice();

        if store.modify_graph(graph, &mut body, Some(base.as_str()), media_type)? {
            Ok(Outcome::NoContent)
        } else {
            Ok(Outcome::BadRequest {
                reason: format!("patch for {} was rejected", graph),
            })
        }
    }

    /// The request body type, which must belong to a registered syntax.
    fn content_type<'r>(&self, request: &'r ProtocolRequest) -> Result<&'r MediaType> {
        let media_type = request
            .content_type
            .as_ref()
            .ok_or_else(|| Error::IllegalArgument("missing Content-Type".to_string()))?;
        if self.syntaxes.for_media_type(media_type).is_none() {
            let known = self
                .syntaxes
                .syntaxes()
                .iter()
                .flat_map(|s| s.media_types().iter().cloned())
                .collect();
            return Err(Error::unsupported(media_type, known));
        }
        Ok(media_type)
    }
}

fn require_target(request: &ProtocolRequest) -> Result<&GraphRef> {
    request.target.as_ref().ok_or_else(|| {
        Error::IllegalArgument(format!("{} requires a graph", request.method))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphInfo;
    use crate::media_type::known;

    fn endpoint() -> ServiceEndpoint {
        ServiceEndpoint::new("http://localhost:8080/").unwrap()
    }

    #[test]
    fn test_endpoint_base_normalized() {
        let ep = ServiceEndpoint::new("http://example.org/cassa").unwrap();
        assert_eq!(ep.base(), "http://example.org/cassa/");
        assert!(matches!(
            ServiceEndpoint::new("not a uri"),
            Err(Error::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_link_for() {
        let ep = endpoint();
        assert_eq!(
            ep.link_for(&GraphRef::named("http://localhost:8080/g/people")),
            "http://localhost:8080/g/people"
        );
        assert_eq!(
            ep.link_for(&GraphRef::named("http://example.org/g?x=1&y")),
            "http://localhost:8080/service?graph=http%3A%2F%2Fexample.org%2Fg%3Fx%3D1%26y"
        );
        assert_eq!(
            ep.link_for(&GraphRef::Default),
            "http://localhost:8080/service?default"
        );
    }

    #[test]
    fn test_link_for_outside_graph_namespace() {
        let ep = endpoint();
        assert_eq!(
            ep.link_for(&GraphRef::named("http://localhost:8080/data/x")),
            "http://localhost:8080/service?graph=http%3A%2F%2Flocalhost%3A8080%2Fdata%2Fx"
        );
        assert_eq!(
            ep.link_for(&GraphRef::named("http://localhost:8080/service")),
            "http://localhost:8080/service?graph=http%3A%2F%2Flocalhost%3A8080%2Fservice"
        );
        for unroutable in [
            "http://localhost:8080/g/",
            "http://localhost:8080/g//x",
            "http://localhost:8080/g/a?b=1",
            "http://localhost:8080/g/a#b",
            "http://localhost:8080/g/a b",
            "http://localhost:8080/g/a%20b",
        ] {
            let link = ep.link_for(&GraphRef::named(unroutable));
            assert!(
                link.starts_with("http://localhost:8080/service?graph="),
                "{} should be linked indirectly",
                unroutable
            );
        }
        assert_eq!(
            ep.link_for(&GraphRef::named("http://localhost:8080/g/a/b-c.ttl")),
            "http://localhost:8080/g/a/b-c.ttl"
        );
    }

    #[test]
    fn test_resolve_path() {
        let ep = endpoint();
        assert_eq!(ep.resolve_path("a/b"), "http://localhost:8080/g/a/b");
        assert_eq!(ep.resolve_path("/a"), "http://localhost:8080/g/a");
    }

    #[test]
    fn test_feed_uris() {
        let ep = endpoint();
        assert_eq!(ep.collection_feed_uri(), "http://localhost:8080/feeds");
        assert_eq!(
            ep.fragments_feed_uri(&GraphRef::Default),
            "http://localhost:8080/feeds/fragments?default"
        );
        assert_eq!(
            ep.snapshots_feed_uri(&GraphRef::named("urn:x")),
            "http://localhost:8080/feeds/snapshots?graph=urn%3Ax"
        );
    }

    #[test]
    fn test_identity_of_default_is_service() {
        let ep = endpoint();
        assert_eq!(ep.identity_of(&GraphRef::Default), "http://localhost:8080/service");
        assert_eq!(ep.identity_of(&GraphRef::named("urn:x")), "urn:x");
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("TRACE".parse::<Method>().is_err());
        assert!(Method::Delete.is_write());
        assert!(!Method::Head.is_write());
    }

    #[test]
    fn test_removal_status_outcome() {
        assert_eq!(Outcome::from(RemovalStatus::Delayed).status_code(), 202);
        assert_eq!(Outcome::from(RemovalStatus::Immediately).status_code(), 204);
    }

    /// A read-only store holding a single graph.
    struct FixedStore {
        info: GraphInfo,
        body: &'static str,
    }

    impl Store for FixedStore {
        fn last_modification(&self) -> Result<i64> {
            Ok(self.info.last_modification())
        }

        fn graph_infos(&self) -> Result<Box<dyn Iterator<Item = GraphInfo> + Send + '_>> {
            Ok(Box::new(std::iter::once(self.info.clone())))
        }

        fn contains_graph(&self, graph: &GraphRef) -> Result<bool> {
            Ok(graph.is_default() || graph == self.info.graph())
        }

        fn graph_info(&self, graph: &GraphRef) -> Result<GraphInfo> {
            if graph == self.info.graph() {
                Ok(self.info.clone())
            } else {
                Err(Error::GraphNotExists(graph.to_string()))
            }
        }

        fn graph(&self, graph: &GraphRef, media_type: &MediaType) -> Result<GraphRepresentation> {
            self.graph_info(graph)?;
            Ok(GraphRepresentation::from_bytes(
                media_type.clone(),
                self.body.as_bytes().to_vec(),
            ))
        }
    }

    const GRAPH: &str = "http://localhost:8080/g/fixed";
    const LM: i64 = 1_000_000_000_000;

    fn protocol() -> GraphProtocol {
        let store = FixedStore {
            info: GraphInfo::new(
                GraphRef::named(GRAPH),
                vec![known::xtm(), known::ctm()],
                LM,
            ),
            body: "<topicMap/>",
        };
        GraphProtocol::new(
            Arc::new(store),
            endpoint(),
            Arc::new(SyntaxRegistry::standard()),
        )
    }

    fn get() -> ProtocolRequest {
        ProtocolRequest::new(Method::Get, Some(GraphRef::named(GRAPH)))
    }

    #[test]
    fn test_get_serves_preferred_type() {
        match protocol().handle(get()).unwrap() {
            Outcome::Ok {
                media_type,
                representation,
                validators,
            } => {
                assert_eq!(media_type, known::xtm());
                assert_eq!(validators.last_modified, Some(LM));
                assert_eq!(
                    validators.etag,
                    generate_etag(GRAPH, LM, Some(&known::xtm()))
                );
                assert_eq!(representation.unwrap().into_bytes().unwrap(), b"<topicMap/>");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_get_negotiates() {
        let request = get().with_accept(AcceptList::parse("application/x-tm+ctm"));
        match protocol().handle(request).unwrap() {
            Outcome::Ok { media_type, .. } => assert_eq!(media_type, known::ctm()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_get_not_acceptable() {
        let request = get().with_accept(AcceptList::parse("text/html"));
        match protocol().handle(request).unwrap() {
            Outcome::NotAcceptable { supported } => {
                assert_eq!(supported, vec![known::xtm(), known::ctm()])
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_head_has_no_body() {
        let request = ProtocolRequest::new(Method::Head, Some(GraphRef::named(GRAPH)));
        match protocol().handle(request).unwrap() {
            Outcome::Ok { representation, .. } => assert!(representation.is_none()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_conditional_get() {
        let etag = generate_etag(GRAPH, LM, Some(&known::xtm())).unwrap();
        let request = get().with_preconditions(
            Preconditions::none().with_if_none_match(&format!("\"{}\"", etag)),
        );
        let outcome = protocol().handle(request).unwrap();
        assert_eq!(outcome.status_code(), 304);
        assert!(outcome.varies_on_accept());

        let request = get().with_preconditions(Preconditions::none().with_if_modified_since(LM));
        assert_eq!(protocol().handle(request).unwrap().status_code(), 304);

        let request =
            get().with_preconditions(Preconditions::none().with_if_modified_since(LM - 1000));
        assert_eq!(protocol().handle(request).unwrap().status_code(), 200);
    }

    #[test]
    fn test_missing_graph() {
        let request = ProtocolRequest::new(Method::Get, Some(GraphRef::named("urn:none")));
        assert!(matches!(
            protocol().handle(request),
            Err(Error::GraphNotExists(_))
        ));
    }

    #[test]
    fn test_writes_on_read_only_store() {
        for method in [Method::Put, Method::Post, Method::Delete, Method::Patch] {
            let request = ProtocolRequest::new(method, Some(GraphRef::named(GRAPH)))
                .with_content_type(known::n_triples());
            assert!(
                matches!(protocol().handle(request), Err(Error::ReadOnly)),
                "{} should be rejected",
                method
            );
        }
    }

    #[test]
    fn test_get_requires_target() {
        let request = ProtocolRequest::new(Method::Get, None);
        assert!(matches!(
            protocol().handle(request),
            Err(Error::IllegalArgument(_))
        ));
    }
}
