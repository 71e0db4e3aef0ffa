//! Graph identities and metadata.

use crate::media_type::MediaType;
use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

/// Timestamp value meaning "last modification unknown".
pub const UNKNOWN_MODIFICATION: i64 = -1;

/// Identifies a graph within a store.
///
/// `Default` is the graph the endpoint itself denotes. It is never equal to
/// a named graph, not even `Named("")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphRef {
    /// The graph the service endpoint itself represents.
    Default,
    /// A graph addressed by its URI.
    Named(String),
}

impl GraphRef {
    /// Creates a reference to a named graph.
    pub fn named(uri: impl Into<String>) -> Self {
        GraphRef::Named(uri.into())
    }

    /// `true` for the default graph.
    pub fn is_default(&self) -> bool {
        matches!(self, GraphRef::Default)
    }

    /// The URI of a named graph; `None` for the default graph.
    pub fn uri(&self) -> Option<&str> {
        match self {
            GraphRef::Default => None,
            GraphRef::Named(uri) => Some(uri),
        }
    }
}

impl fmt::Display for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphRef::Default => f.write_str("<default>"),
            GraphRef::Named(uri) => f.write_str(uri),
        }
    }
}

/// Immutable metadata about a graph, produced fresh by every store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphInfo {
    graph: GraphRef,
    media_types: Vec<MediaType>,
    last_modification: i64,
    title: Option<String>,
    description: Option<String>,
}

impl GraphInfo {
    /// Creates graph metadata. `media_types[0]` is the preferred representation.
    pub fn new(graph: GraphRef, media_types: Vec<MediaType>, last_modification: i64) -> Self {
        Self {
            graph,
            media_types,
            last_modification,
            title: None,
            description: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn graph(&self) -> &GraphRef {
        &self.graph
    }

    /// The supported media types, preferred first.
    pub fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    pub fn preferred_media_type(&self) -> Option<&MediaType> {
        self.media_types.first()
    }

    /// Milliseconds since the epoch, or [`UNKNOWN_MODIFICATION`].
    pub fn last_modification(&self) -> i64 {
        self.last_modification
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// The role a resource URI plays for the subject it identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceRole {
    /// Plain RDF resource.
    None,
    /// Topic Maps subject identifier.
    SubjectIdentifier,
    /// Topic Maps subject locator.
    SubjectLocator,
    /// Topic Maps item identifier.
    ItemIdentifier,
}

impl ResourceRole {
    /// The kebab-case name used in feeds; `None` for [`ResourceRole::None`].
    pub fn as_feed_value(&self) -> Option<&'static str> {
        match self {
            ResourceRole::None => None,
            ResourceRole::SubjectIdentifier => Some("subject-identifier"),
            ResourceRole::SubjectLocator => Some("subject-locator"),
            ResourceRole::ItemIdentifier => Some("item-identifier"),
        }
    }
}

/// A subject touched by a change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    pub uri: String,
    pub role: ResourceRole,
}

impl Resource {
    pub fn new(uri: impl Into<String>, role: ResourceRole) -> Self {
        Self {
            uri: uri.into(),
            role,
        }
    }

    /// A resource without a Topic Maps role.
    pub fn plain(uri: impl Into<String>) -> Self {
        Self::new(uri, ResourceRole::None)
    }
}

/// Graph metadata for one change, plus the resources the change touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentInfo {
    info: GraphInfo,
    resources: IndexSet<Resource>,
    sequence: u64,
}

impl FragmentInfo {
    /// Creates a fragment; duplicate resources are collapsed.
    pub fn new(info: GraphInfo, resources: impl IntoIterator<Item = Resource>) -> Self {
        Self {
            info,
            resources: resources.into_iter().collect(),
            sequence: 0,
        }
    }

    /// Sets the position of this change in the store's change order.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn info(&self) -> &GraphInfo {
        &self.info
    }

    /// Distinguishes changes made within the same millisecond. Increases
    /// with every change a store records; 0 if the store does not number
    /// its changes.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The touched resources in first-seen order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

/// Outcome of a delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStatus {
    /// The data is gone; subsequent reads will not see it.
    Immediately,
    /// The removal was accepted and will complete later.
    Delayed,
}
