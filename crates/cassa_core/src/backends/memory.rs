//! In-memory storage backend
//!
//! Graphs are ordered sets of N-Triples lines in canonical form: every
//! statement is parsed into RDF terms and written back out, so equal
//! statements are equal strings. Every write parses its input completely
//! before it takes the write lock, so a failed write never changes a graph.

use crate::error::{Error, Result};
use crate::graph::{
    FragmentInfo, GraphInfo, GraphRef, RemovalStatus, Resource, UNKNOWN_MODIFICATION,
};
use crate::media_type::{known, MediaType};
use crate::store::{GraphRepresentation, ModifiableStore, Store, Stored};
use indexmap::{IndexMap, IndexSet};
use spargebra::term::GraphName;
use spargebra::{GraphUpdateOperation, Update};
use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, RwLock};

/// Source of modification timestamps in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Number of changes kept for the fragments feeds unless configured.
pub const DEFAULT_CHANGE_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Default)]
struct StoredGraph {
    statements: IndexSet<String>,
    last_modification: i64,
    title: Option<String>,
    description: Option<String>,
}

impl StoredGraph {
    fn empty() -> Self {
        Self {
            last_modification: UNKNOWN_MODIFICATION,
            ..Self::default()
        }
    }

    fn subjects(&self) -> IndexSet<&str> {
        self.statements.iter().map(|s| subject_of(s)).collect()
    }
}

#[derive(Debug)]
struct Inner {
    default: StoredGraph,
    named: IndexMap<String, StoredGraph>,
    changes: VecDeque<FragmentInfo>,
    change_limit: usize,
    next_sequence: u64,
    last_modification: i64,
}

impl Inner {
    fn get(&self, graph: &GraphRef) -> Option<&StoredGraph> {
        match graph {
            GraphRef::Default => Some(&self.default),
            GraphRef::Named(uri) => self.named.get(uri),
        }
    }

    fn get_mut(&mut self, graph: &GraphRef) -> Option<&mut StoredGraph> {
        match graph {
            GraphRef::Default => Some(&mut self.default),
            GraphRef::Named(uri) => self.named.get_mut(uri),
        }
    }

    fn require(&self, graph: &GraphRef) -> Result<&StoredGraph> {
        self.get(graph)
            .ok_or_else(|| Error::GraphNotExists(graph.to_string()))
    }

    /// Publishes `statements` as the new content of `graph` and logs the
    /// subjects that changed.
    fn commit(&mut self, graph: &GraphRef, statements: IndexSet<String>, now: i64) -> GraphInfo {
        let stored = match graph {
            GraphRef::Default => &mut self.default,
            GraphRef::Named(uri) => self
                .named
                .entry(uri.clone())
                .or_insert_with(StoredGraph::empty),
        };
        let touched: IndexSet<String> = stored
            .statements
            .symmetric_difference(&statements)
            .map(|s| subject_of(s).to_string())
            .collect();
        stored.statements = statements;
        stored.last_modification = now;
        let info = info_of(graph, stored);
        self.record(info.clone(), touched);
        info
    }

    fn record(&mut self, info: GraphInfo, subjects: IndexSet<String>) {
        self.last_modification = self.last_modification.max(info.last_modification());
        self.next_sequence += 1;
        let fragment = FragmentInfo::new(info, subjects.iter().map(|s| resource_of(s)))
            .with_sequence(self.next_sequence);
        self.changes.push_back(fragment);
        while self.changes.len() > self.change_limit {
            self.changes.pop_front();
        }
    }

    /// A timestamp for the next write, never older than the last one.
    fn stamp(&self, clock: &Clock) -> i64 {
        clock().max(self.last_modification)
    }
}

/// Thread-safe in-memory graph store.
///
/// Accepts and serves `application/n-triples` (and `text/plain`); patches
/// are SPARQL Update `INSERT DATA` / `DELETE DATA` requests.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    clock: Clock,
}

impl MemoryStore {
    /// Create an empty store stamped with the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(crate::dates::now_millis))
    }

    /// Create an empty store with a custom clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            inner: RwLock::new(Inner {
                default: StoredGraph::empty(),
                named: IndexMap::new(),
                changes: VecDeque::new(),
                change_limit: DEFAULT_CHANGE_LIMIT,
                next_sequence: 0,
                last_modification: UNKNOWN_MODIFICATION,
            }),
            clock,
        }
    }

    /// Keeps at most `limit` changes for the fragments feeds, dropping the
    /// oldest first. Clients that fall behind the log recover from the
    /// snapshots feed.
    pub fn with_change_limit(mut self, limit: usize) -> Self {
        if let Ok(inner) = self.inner.get_mut() {
            inner.change_limit = limit;
        }
        self
    }

    /// Wraps this store so that only its read side is visible.
    pub fn read_only(self) -> ReadOnlyStore<Self> {
        ReadOnlyStore::new(self)
    }

    /// Sets the title and description reported for an existing graph.
    pub fn describe_graph(
        &self,
        graph: &GraphRef,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let stored = inner
            .get_mut(graph)
            .ok_or_else(|| Error::GraphNotExists(graph.to_string()))?;
        stored.title = title.map(str::to_string);
        stored.description = description.map(str::to_string);
        Ok(())
    }

    /// Number of statements in `graph`.
    pub fn statement_count(&self, graph: &GraphRef) -> Result<usize> {
        Ok(self.read()?.require(graph)?.statements.len())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| Error::Store("lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| Error::Store("lock poisoned".into()))
    }

}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn supported_media_types() -> Vec<MediaType> {
    vec![known::n_triples(), known::text_plain()]
}

fn check_media_type(media_type: &MediaType) -> Result<()> {
    let supported = supported_media_types();
    if supported.contains(&media_type.without_parameters()) {
        Ok(())
    } else {
        Err(Error::unsupported(media_type, supported))
    }
}

fn info_of(graph: &GraphRef, stored: &StoredGraph) -> GraphInfo {
    let mut info = GraphInfo::new(graph.clone(), supported_media_types(), stored.last_modification);
    if let Some(title) = &stored.title {
        info = info.with_title(title.clone());
    }
    if let Some(description) = &stored.description {
        info = info.with_description(description.clone());
    }
    info
}

/// The subject token of a statement line.
fn subject_of(statement: &str) -> &str {
    statement.split_whitespace().next().unwrap_or_default()
}

/// Normalizes a subject given as a bare IRI, `<iri>` or blank node label.
fn subject_token(subject: &str) -> String {
    if subject.starts_with('<') || subject.starts_with("_:") {
        subject.to_string()
    } else {
        format!("<{}>", subject)
    }
}

fn resource_of(token: &str) -> Resource {
    let uri = token
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(token);
    Resource::plain(uri)
}

fn read_text(input: &mut dyn Read) -> Result<String> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| Error::ParseError(format!("input is not UTF-8: {}", e)))
}

/// Splits N-Triples text into canonical `s p o .` lines.
fn parse_statements(
    input: &mut dyn Read,
    base_uri: Option<&str>,
    media_type: &MediaType,
) -> Result<IndexSet<String>> {
    check_media_type(media_type)?;
    let text = read_text(input)?;
    let mut statements = IndexSet::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let statement = parse_line(line, base_uri)
            .ok_or_else(|| Error::ParseError(format!("line {}: malformed statement", index + 1)))?;
        statements.insert(statement);
    }
    Ok(statements)
}

/// Parses one statement into RDF terms and renders it the way patches are
/// rendered, so both sides compare as equal strings.
fn parse_line(line: &str, base_uri: Option<&str>) -> Option<String> {
    if !line.ends_with('.') {
        return None;
    }
    let update = Update::parse(&format!("INSERT DATA {{\n{}\n}}", line), base_uri).ok()?;
    match update.operations.as_slice() {
        [GraphUpdateOperation::InsertData { data }] => match data.as_slice() {
            [quad] if matches!(quad.graph_name, GraphName::DefaultGraph) => {
                Some(statement_of(&quad.subject, &quad.predicate, &quad.object))
            }
            _ => None,
        },
        _ => None,
    }
}

fn statement_of(
    subject: impl std::fmt::Display,
    predicate: impl std::fmt::Display,
    object: impl std::fmt::Display,
) -> String {
    format!("{} {} {} .", subject, predicate, object)
}

enum PatchStep {
    Insert(String),
    Delete(String),
}

/// Checks that a quad from a patch addresses `target`.
fn check_graph_name(target: &GraphRef, name: &GraphName) -> Result<()> {
    match (target, name) {
        (_, GraphName::DefaultGraph) => Ok(()),
        (GraphRef::Named(uri), GraphName::NamedNode(node)) if node.as_str() == uri => Ok(()),
        (_, GraphName::NamedNode(node)) => Err(Error::GraphMismatch {
            expected: target.to_string(),
            found: node.as_str().to_string(),
        }),
    }
}

impl Store for MemoryStore {
    fn last_modification(&self) -> Result<i64> {
        Ok(self.read()?.last_modification)
    }

    fn graph_infos(&self) -> Result<Box<dyn Iterator<Item = GraphInfo> + Send + '_>> {
        let inner = self.read()?;
        let infos: Vec<GraphInfo> = inner
            .named
            .iter()
            .map(|(uri, stored)| info_of(&GraphRef::named(uri.as_str()), stored))
            .collect();
        Ok(Box::new(infos.into_iter()))
    }

    fn contains_graph(&self, graph: &GraphRef) -> Result<bool> {
        Ok(self.read()?.get(graph).is_some())
    }

    fn graph_info(&self, graph: &GraphRef) -> Result<GraphInfo> {
        let inner = self.read()?;
        Ok(info_of(graph, inner.require(graph)?))
    }

    fn graph(&self, graph: &GraphRef, media_type: &MediaType) -> Result<GraphRepresentation> {
        let inner = self.read()?;
        let stored = inner.require(graph)?;
        check_media_type(media_type)?;
        let mut body = String::new();
        for statement in &stored.statements {
            body.push_str(statement);
            body.push('\n');
        }
        Ok(GraphRepresentation::from_bytes(media_type.clone(), body.into_bytes()))
    }

    fn fragment_infos(&self, graph: &GraphRef, since: i64) -> Result<Vec<FragmentInfo>> {
        let inner = self.read()?;
        Ok(inner
            .changes
            .iter()
            .filter(|f| f.info().graph() == graph && f.info().last_modification() > since)
            .cloned()
            .collect())
    }

    fn as_modifiable(&self) -> Option<&dyn ModifiableStore> {
        Some(self)
    }
}

impl ModifiableStore for MemoryStore {
    fn delete_graph(&self, graph: &GraphRef) -> Result<RemovalStatus> {
        let mut inner = self.write()?;
        let now = inner.stamp(&self.clock);
        match graph {
            GraphRef::Default => {
                inner.commit(graph, IndexSet::new(), now);
            }
            GraphRef::Named(uri) => {
                let removed = inner
                    .named
                    .shift_remove(uri)
                    .ok_or_else(|| Error::GraphNotExists(uri.clone()))?;
                let subjects = removed.subjects().into_iter().map(str::to_string).collect();
                let info = GraphInfo::new(graph.clone(), supported_media_types(), now);
                inner.record(info, subjects);
            }
        }
        log::debug!("deleted graph {}", graph);
        Ok(RemovalStatus::Immediately)
    }

    fn delete_subject(&self, graph: &GraphRef, subject: &str) -> Result<RemovalStatus> {
        let token = subject_token(subject);
        let mut inner = self.write()?;
        let now = inner.stamp(&self.clock);
        let mut statements = inner.require(graph)?.statements.clone();
        statements.retain(|s| subject_of(s) != token);
        inner.commit(graph, statements, now);
        log::debug!("deleted subject {} from {}", token, graph);
        Ok(RemovalStatus::Immediately)
    }

    fn create_graph(
        &self,
        input: &mut dyn Read,
        base_uri: &str,
        media_type: &MediaType,
    ) -> Result<GraphInfo> {
        let graph = GraphRef::named(format!("{}{}", base_uri, uuid::Uuid::new_v4()));
        let statements = parse_statements(input, graph.uri(), media_type)?;
        let mut inner = self.write()?;
        let now = inner.stamp(&self.clock);
        let info = inner.commit(&graph, statements, now);
        log::debug!("created graph {}", graph);
        Ok(info)
    }

    fn create_or_replace_graph(
        &self,
        graph: &GraphRef,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<Stored> {
        let statements = parse_statements(input, base_uri, media_type)?;
        let mut inner = self.write()?;
        let created = inner.get(graph).is_none();
        let now = inner.stamp(&self.clock);
        let info = inner.commit(graph, statements, now);
        log::debug!("{} graph {}", if created { "created" } else { "replaced" }, graph);
        Ok(Stored { info, created })
    }

    fn update_graph(
        &self,
        graph: &GraphRef,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<GraphInfo> {
        let additions = parse_statements(input, base_uri, media_type)?;
        let mut inner = self.write()?;
        let now = inner.stamp(&self.clock);
        let mut statements = inner.require(graph)?.statements.clone();
        statements.extend(additions);
        let info = inner.commit(graph, statements, now);
        log::debug!("merged into graph {}", graph);
        Ok(info)
    }

    fn create_or_replace_subject(
        &self,
        graph: &GraphRef,
        subject: &str,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<GraphInfo> {
        let token = subject_token(subject);
        let replacement = parse_statements(input, base_uri, media_type)?;
        if let Some(other) = replacement.iter().find(|s| subject_of(s) != token) {
            return Err(Error::ParseError(format!(
                "statement is not about {}: {}",
                token, other
            )));
        }
        let mut inner = self.write()?;
        let now = inner.stamp(&self.clock);
        let mut statements = inner
            .get(graph)
            .map(|g| g.statements.clone())
            .unwrap_or_default();
        statements.retain(|s| subject_of(s) != token);
        statements.extend(replacement);
        let info = inner.commit(graph, statements, now);
        log::debug!("replaced subject {} in {}", token, graph);
        Ok(info)
    }

    fn modify_graph(
        &self,
        graph: &GraphRef,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<bool> {
        if media_type.without_parameters() != known::sparql_update() {
            return Err(Error::unsupported(media_type, vec![known::sparql_update()]));
        }
        let text = read_text(input)?;
        let update = Update::parse(&text, base_uri).map_err(|e| Error::QueryError(e.to_string()))?;

        // Rendered before locking, replayed in order under the lock.
        let mut steps = Vec::new();
        for operation in &update.operations {
            match operation {
                GraphUpdateOperation::InsertData { data } => {
                    for quad in data {
                        check_graph_name(graph, &quad.graph_name)?;
                        let statement = statement_of(&quad.subject, &quad.predicate, &quad.object);
                        steps.push(PatchStep::Insert(statement));
                    }
                }
                GraphUpdateOperation::DeleteData { data } => {
                    for quad in data {
                        check_graph_name(graph, &quad.graph_name)?;
                        let statement = statement_of(&quad.subject, &quad.predicate, &quad.object);
                        steps.push(PatchStep::Delete(statement));
                    }
                }
                other => {
                    log::warn!("rejected patch for {}: unsupported operation {:?}", graph, other);
                    return Ok(false);
                }
            }
        }

        let mut inner = self.write()?;
        let mut statements = inner.require(graph)?.statements.clone();
        for step in steps {
            match step {
                PatchStep::Insert(statement) => {
                    statements.insert(statement);
                }
                PatchStep::Delete(statement) => {
                    statements.shift_remove(&statement);
                }
            }
        }
        let now = inner.stamp(&self.clock);
        inner.commit(graph, statements, now);
        log::debug!("patched graph {}", graph);
        Ok(true)
    }
}

/// Exposes only the read side of a store.
pub struct ReadOnlyStore<S> {
    inner: S,
}

impl<S: Store> ReadOnlyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Store> Store for ReadOnlyStore<S> {
    fn last_modification(&self) -> Result<i64> {
        self.inner.last_modification()
    }

    fn graph_infos(&self) -> Result<Box<dyn Iterator<Item = GraphInfo> + Send + '_>> {
        self.inner.graph_infos()
    }

    fn contains_graph(&self, graph: &GraphRef) -> Result<bool> {
        self.inner.contains_graph(graph)
    }

    fn graph_info(&self, graph: &GraphRef) -> Result<GraphInfo> {
        self.inner.graph_info(graph)
    }

    fn graph(&self, graph: &GraphRef, media_type: &MediaType) -> Result<GraphRepresentation> {
        self.inner.graph(graph, media_type)
    }

    fn fragment_infos(&self, graph: &GraphRef, since: i64) -> Result<Vec<FragmentInfo>> {
        self.inner.fragment_infos(graph, since)
    }
}
