//! SDShare feed event model.
//!
//! Feeds are produced by driving a [`FeedHandler`] through the event grammar
//!
//! ```text
//! start_feed {link | author | generator | resource | summary}*
//!     {start_entry {link | author | resource | summary}* end_entry}*
//! end_feed
//! ```
//!
//! Consecutive events of one kind form a group (the `links`, `authors`,
//! `resources` and `entries` arrays of the JSON shape). [`FeedState`] tracks
//! which group is open and rejects sequences that would reopen a group that
//! was already closed at the same level.

mod atom;
mod json;

pub use atom::{escape_xml, AtomWriter, AtomWriterFactory, XmlEncoding};
pub use json::{JsonWriter, JsonWriterFactory};

use crate::error::{Error, Result};
use crate::graph::Resource;
use crate::media_type::{known, MediaType};
use crate::negotiation::{negotiate, AcceptList, Negotiated};
use std::io::Write;

/// Atom 1.0 namespace.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
/// SDShare core namespace.
pub const SDSHARE_NS: &str = "http://www.sdshare.org/2012/core/";
/// Link relation from a collection entry to its collection feed.
pub const REL_COLLECTION_FEED: &str = "http://www.sdshare.org/2012/core/collectionfeed";
/// Link relation from a collection entry to its fragments feed.
pub const REL_FRAGMENTS_FEED: &str = "http://www.sdshare.org/2012/core/fragmentsfeed";
/// Link relation from a collection entry to its snapshots feed.
pub const REL_SNAPSHOTS_FEED: &str = "http://www.sdshare.org/2012/core/snapshotsfeed";

/// Receives feed events in grammar order.
pub trait FeedHandler {
    fn start_feed(&mut self, id: &str, title: &str, updated: i64) -> Result<()>;

    fn link(&mut self, href: &str, rel: &str, media_type: Option<&MediaType>) -> Result<()>;

    fn author(&mut self, name: &str, email: Option<&str>, uri: Option<&str>) -> Result<()>;

    /// Feed level only.
    fn generator(&mut self, name: &str, uri: Option<&str>, version: Option<&str>) -> Result<()>;

    fn resource(&mut self, resource: &Resource) -> Result<()>;

    fn summary(&mut self, text: &str) -> Result<()>;

    fn start_entry(&mut self, id: &str, title: &str, updated: i64) -> Result<()>;

    fn end_entry(&mut self) -> Result<()>;

    /// Closes all open groups, finalizes and flushes the output.
    fn end_feed(&mut self) -> Result<()>;
}

/// An event of the feed grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    StartFeed,
    Link,
    Author,
    Generator,
    Resource,
    Summary,
    StartEntry,
    EndEntry,
    EndFeed,
}

/// A run of same-kind events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Links,
    Authors,
    Resources,
    Entries,
}

impl Group {
    /// The member name of the group in the JSON shape.
    pub fn key(&self) -> &'static str {
        match self {
            Group::Links => "links",
            Group::Authors => "authors",
            Group::Resources => "resources",
            Group::Entries => "entries",
        }
    }
}

impl FeedEvent {
    fn group(&self) -> Option<Group> {
        match self {
            FeedEvent::Link => Some(Group::Links),
            FeedEvent::Author => Some(Group::Authors),
            FeedEvent::Resource => Some(Group::Resources),
            FeedEvent::StartEntry => Some(Group::Entries),
            _ => None,
        }
    }
}

/// The group currently open at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupState {
    #[default]
    Idle,
    InLinks,
    InAuthors,
    InResources,
    InEntries,
}

impl GroupState {
    fn open(group: Group) -> Self {
        match group {
            Group::Links => GroupState::InLinks,
            Group::Authors => GroupState::InAuthors,
            Group::Resources => GroupState::InResources,
            Group::Entries => GroupState::InEntries,
        }
    }

    fn group(&self) -> Option<Group> {
        match self {
            GroupState::Idle => None,
            GroupState::InLinks => Some(Group::Links),
            GroupState::InAuthors => Some(Group::Authors),
            GroupState::InResources => Some(Group::Resources),
            GroupState::InEntries => Some(Group::Entries),
        }
    }
}

/// What a writer has to emit for one event, besides the event itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Step {
    /// A group that ends before the event.
    pub closed: Option<Group>,
    /// A group that begins with the event.
    pub opened: Option<Group>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    InFeed,
    InEntry,
    Ended,
}

#[derive(Debug, Default)]
struct Level {
    current: GroupState,
    closed: Vec<Group>,
}

impl Level {
    fn enter(&mut self, group: Option<Group>) -> Result<Step> {
        if group.is_some() && self.current.group() == group {
            return Ok(Step::default());
        }
        let closed = self.close_current();
        let mut opened = None;
        if let Some(group) = group {
            if self.closed.contains(&group) {
                return Err(Error::Internal(format!(
                    "feed group '{}' was already closed at this level",
                    group.key()
                )));
            }
            self.current = GroupState::open(group);
            opened = Some(group);
        }
        Ok(Step { closed, opened })
    }

    fn leave(&mut self) -> Step {
        Step {
            closed: self.close_current(),
            opened: None,
        }
    }

    fn close_current(&mut self) -> Option<Group> {
        let group = self.current.group()?;
        self.closed.push(group);
        self.current = GroupState::Idle;
        Some(group)
    }
}

/// Validates the feed grammar and computes group transitions.
#[derive(Debug)]
pub struct FeedState {
    phase: Phase,
    feed: Level,
    entry: Level,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self {
            phase: Phase::NotStarted,
            feed: Level::default(),
            entry: Level::default(),
        }
    }

    /// The group open at the innermost level.
    pub fn current_group(&self) -> GroupState {
        match self.phase {
            Phase::InEntry => self.entry.current,
            _ => self.feed.current,
        }
    }

    /// `true` once `end_feed` was accepted.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Accepts `event` and returns the group transitions it causes.
    ///
    /// # Errors
    ///
    /// [`Error::Internal`] if the event violates the grammar; the state is
    /// left unchanged in that case except for a reopened group.
    pub fn apply(&mut self, event: FeedEvent) -> Result<Step> {
        match (self.phase, event) {
            (Phase::NotStarted, FeedEvent::StartFeed) => {
                self.phase = Phase::InFeed;
                Ok(Step::default())
            }
            (Phase::InFeed, FeedEvent::StartEntry) => {
                let step = self.feed.enter(Some(Group::Entries))?;
                self.entry = Level::default();
                self.phase = Phase::InEntry;
                Ok(step)
            }
            (Phase::InFeed, FeedEvent::EndFeed) => {
                self.phase = Phase::Ended;
                Ok(self.feed.leave())
            }
            (Phase::InEntry, FeedEvent::EndEntry) => {
                self.phase = Phase::InFeed;
                Ok(self.entry.leave())
            }
            (Phase::InFeed, FeedEvent::Link)
            | (Phase::InFeed, FeedEvent::Author)
            | (Phase::InFeed, FeedEvent::Generator)
            | (Phase::InFeed, FeedEvent::Resource)
            | (Phase::InFeed, FeedEvent::Summary) => {
                if self.feed.current == GroupState::InEntries
                    || self.feed.closed.contains(&Group::Entries)
                {
                    return Err(violation(event, "feed metadata must precede the first entry"));
                }
                self.feed.enter(event.group())
            }
            (Phase::InEntry, FeedEvent::Link)
            | (Phase::InEntry, FeedEvent::Author)
            | (Phase::InEntry, FeedEvent::Resource)
            | (Phase::InEntry, FeedEvent::Summary) => self.entry.enter(event.group()),
            (Phase::NotStarted, _) => Err(violation(event, "feed not started")),
            (Phase::Ended, _) => Err(violation(event, "feed already ended")),
            (Phase::InEntry, FeedEvent::Generator) => {
                Err(violation(event, "generator is only allowed at feed level"))
            }
            (Phase::InEntry, _) => Err(violation(event, "entry not ended")),
            (Phase::InFeed, _) => Err(violation(event, "no entry open")),
        }
    }
}

fn violation(event: FeedEvent, reason: &str) -> Error {
    Error::Internal(format!("unexpected feed event {:?}: {}", event, reason))
}

/// Creates feed handlers for one output format.
pub trait FeedWriterFactory: Send + Sync {
    /// A short name such as `"atom"`.
    fn name(&self) -> &str;

    /// The media type of the produced documents.
    fn media_type(&self) -> MediaType;

    /// Creates a handler that writes one feed to `out`.
    fn create<'a>(&self, out: Box<dyn Write + Send + 'a>) -> Box<dyn FeedHandler + Send + 'a>;
}

/// The feed formats available to the server, registered at startup.
#[derive(Default)]
pub struct FeedWriterRegistry {
    factories: Vec<Box<dyn FeedWriterFactory>>,
}

impl FeedWriterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the Atom (UTF-8) and JSON writers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AtomWriterFactory::default()));
        registry.register(Box::new(JsonWriterFactory));
        registry
    }

    pub fn register(&mut self, factory: Box<dyn FeedWriterFactory>) {
        log::debug!("registered feed writer '{}'", factory.name());
        self.factories.push(factory);
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// The Atom writer if registered, otherwise the first registered one.
    pub fn preferred(&self) -> Option<&dyn FeedWriterFactory> {
        self.factories
            .iter()
            .find(|f| f.media_type() == known::atom())
            .or_else(|| self.factories.first())
            .map(|f| f.as_ref())
    }

    /// Media types of all writers, the preferred writer first.
    pub fn media_types(&self) -> Vec<MediaType> {
        let mut types = Vec::with_capacity(self.factories.len());
        if let Some(preferred) = self.preferred() {
            types.push(preferred.media_type());
        }
        for factory in &self.factories {
            let mt = factory.media_type();
            if !types.contains(&mt) {
                types.push(mt);
            }
        }
        types
    }

    /// Picks the writer the client accepts best.
    pub fn negotiate(&self, accept: &AcceptList) -> std::result::Result<&dyn FeedWriterFactory, Vec<MediaType>> {
        match negotiate(accept, &self.media_types()) {
            Negotiated::Selected(mt) => self
                .factories
                .iter()
                .find(|f| f.media_type() == mt)
                .map(|f| f.as_ref())
                .ok_or_else(|| self.media_types()),
            Negotiated::NotAcceptable(supported) => Err(supported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[FeedEvent]) -> Result<Vec<Step>> {
        let mut state = FeedState::new();
        events.iter().map(|e| state.apply(*e)).collect()
    }

    #[test]
    fn test_grouping_transitions() {
        use FeedEvent::*;
        let steps = run(&[StartFeed, Link, Link, StartEntry, Author, EndEntry, EndFeed]).unwrap();
        assert_eq!(steps[1].opened, Some(Group::Links));
        assert_eq!(steps[2], Step::default());
        assert_eq!(
            steps[3],
            Step {
                closed: Some(Group::Links),
                opened: Some(Group::Entries)
            }
        );
        assert_eq!(steps[4].opened, Some(Group::Authors));
        assert_eq!(steps[5].closed, Some(Group::Authors));
        assert_eq!(steps[6].closed, Some(Group::Entries));
    }

    #[test]
    fn test_consecutive_entries_share_group() {
        use FeedEvent::*;
        let steps = run(&[StartFeed, StartEntry, EndEntry, StartEntry, EndEntry, EndFeed]).unwrap();
        assert_eq!(steps[1].opened, Some(Group::Entries));
        assert_eq!(steps[3], Step::default());
        assert_eq!(steps[5].closed, Some(Group::Entries));
    }

    #[test]
    fn test_entry_levels_are_independent() {
        use FeedEvent::*;
        run(&[
            StartFeed, StartEntry, Link, Author, EndEntry, StartEntry, Link, Author, EndEntry,
            EndFeed,
        ])
        .unwrap();
    }

    #[test]
    fn test_reopening_group_is_internal_error() {
        use FeedEvent::*;
        assert!(matches!(
            run(&[StartFeed, Link, Author, Link]),
            Err(Error::Internal(_))
        ));
        assert!(matches!(
            run(&[StartFeed, StartEntry, Resource, Summary, Resource]),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_feed_metadata_after_entries_rejected() {
        use FeedEvent::*;
        assert!(run(&[StartFeed, StartEntry, EndEntry, Link]).is_err());
        assert!(run(&[StartFeed, StartEntry, EndEntry, Summary]).is_err());
    }

    #[test]
    fn test_grammar_violations() {
        use FeedEvent::*;
        assert!(run(&[Link]).is_err());
        assert!(run(&[StartFeed, StartFeed]).is_err());
        assert!(run(&[StartFeed, EndEntry]).is_err());
        assert!(run(&[StartFeed, StartEntry, StartEntry]).is_err());
        assert!(run(&[StartFeed, StartEntry, Generator]).is_err());
        assert!(run(&[StartFeed, StartEntry, EndFeed]).is_err());
        assert!(run(&[StartFeed, EndFeed, EndFeed]).is_err());
    }

    #[test]
    fn test_current_group() {
        let mut state = FeedState::new();
        state.apply(FeedEvent::StartFeed).unwrap();
        state.apply(FeedEvent::Link).unwrap();
        assert_eq!(state.current_group(), GroupState::InLinks);
        state.apply(FeedEvent::StartEntry).unwrap();
        assert_eq!(state.current_group(), GroupState::Idle);
        state.apply(FeedEvent::Resource).unwrap();
        assert_eq!(state.current_group(), GroupState::InResources);
        state.apply(FeedEvent::EndEntry).unwrap();
        assert_eq!(state.current_group(), GroupState::InEntries);
        state.apply(FeedEvent::EndFeed).unwrap();
        assert!(state.is_finished());
    }

    #[test]
    fn test_registry_prefers_atom() {
        let mut registry = FeedWriterRegistry::new();
        assert!(registry.preferred().is_none());
        registry.register(Box::new(JsonWriterFactory));
        assert_eq!(registry.preferred().unwrap().name(), "json");
        registry.register(Box::new(AtomWriterFactory::default()));
        assert_eq!(registry.preferred().unwrap().name(), "atom");
        assert_eq!(registry.media_types(), vec![known::atom(), known::json()]);
    }

    #[test]
    fn test_registry_negotiation() {
        let registry = FeedWriterRegistry::standard();
        let any = registry.negotiate(&AcceptList::any()).ok().unwrap();
        assert_eq!(any.name(), "atom");
        let json = registry
            .negotiate(&AcceptList::parse("application/json"))
            .ok()
            .unwrap();
        assert_eq!(json.name(), "json");
        let err = registry
            .negotiate(&AcceptList::parse("text/html"))
            .err()
            .unwrap();
        assert_eq!(err.len(), 2);
    }
}
