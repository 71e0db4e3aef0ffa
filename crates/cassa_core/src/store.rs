//! The graph store contract every backend implements.
//!
//! [`Store`] is the read side and is always available. Backends that accept
//! writes also implement [`ModifiableStore`] and expose it through
//! [`Store::as_modifiable`]; a store returning `None` there is read-only for
//! its whole lifetime, which callers see as [`Error::ReadOnly`].

use crate::error::{Error, Result};
use crate::graph::{FragmentInfo, GraphInfo, GraphRef, RemovalStatus};
use crate::media_type::MediaType;
use std::fmt;
use std::io::{Cursor, Read, Write};

/// Read access to a set of graphs.
///
/// Implementations must be safe to call from many requests at once.
pub trait Store: Send + Sync {
    /// Time of the most recent change to any graph, or `-1` if unknown.
    fn last_modification(&self) -> Result<i64>;

    /// Metadata of every graph in the store. Finite; order is backend-defined.
    fn graph_infos(&self) -> Result<Box<dyn Iterator<Item = GraphInfo> + Send + '_>>;

    /// Checks whether `graph` exists. Always `true` for [`GraphRef::Default`].
    fn contains_graph(&self, graph: &GraphRef) -> Result<bool>;

    /// Metadata of one graph.
    ///
    /// # Errors
    ///
    /// [`Error::GraphNotExists`] if a named graph is absent.
    fn graph_info(&self, graph: &GraphRef) -> Result<GraphInfo>;

    /// A streamed representation of `graph` in `media_type`.
    ///
    /// # Errors
    ///
    /// [`Error::GraphNotExists`] or [`Error::UnsupportedMediaType`].
    fn graph(&self, graph: &GraphRef, media_type: &MediaType) -> Result<GraphRepresentation>;

    /// Changes to `graph` made after `since`, oldest first.
    fn fragment_infos(&self, _graph: &GraphRef, _since: i64) -> Result<Vec<FragmentInfo>> {
        Ok(Vec::new())
    }

    /// The write side of this store, if it has one.
    fn as_modifiable(&self) -> Option<&dyn ModifiableStore> {
        None
    }

    /// Like [`as_modifiable`](Self::as_modifiable), failing with [`Error::ReadOnly`].
    fn require_modifiable(&self) -> Result<&dyn ModifiableStore> {
        self.as_modifiable().ok_or(Error::ReadOnly)
    }
}

/// Write access to a set of graphs.
///
/// A failed write must leave the graph as it was before the call.
pub trait ModifiableStore: Store {
    /// Removes a graph.
    fn delete_graph(&self, graph: &GraphRef) -> Result<RemovalStatus>;

    /// Removes every statement about `subject` from `graph`.
    fn delete_subject(&self, graph: &GraphRef, subject: &str) -> Result<RemovalStatus>;

    /// Creates a graph with a fresh URI under `base_uri`.
    fn create_graph(
        &self,
        input: &mut dyn Read,
        base_uri: &str,
        media_type: &MediaType,
    ) -> Result<GraphInfo>;

    /// Replaces `graph` with the input, creating it if absent.
    ///
    /// Whether the graph was created is decided by the same atomic step
    /// that stores it.
    fn create_or_replace_graph(
        &self,
        graph: &GraphRef,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<Stored>;

    /// Merges the input into an existing graph.
    fn update_graph(
        &self,
        graph: &GraphRef,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<GraphInfo>;

    /// Replaces the statements about `subject` with the input.
    fn create_or_replace_subject(
        &self,
        graph: &GraphRef,
        subject: &str,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<GraphInfo>;

    /// Applies a patch document.
    ///
    /// Returns `false` if the store rejected a well-formed patch.
    ///
    /// # Errors
    ///
    /// [`Error::QueryError`] for a malformed patch, [`Error::GraphMismatch`]
    /// if the patch names another graph.
    fn modify_graph(
        &self,
        graph: &GraphRef,
        input: &mut dyn Read,
        base_uri: Option<&str>,
        media_type: &MediaType,
    ) -> Result<bool>;
}

/// Result of [`ModifiableStore::create_or_replace_graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    pub info: GraphInfo,
    /// `true` if the graph did not exist before the write.
    pub created: bool,
}

/// A graph serialization that is produced lazily.
///
/// The underlying reader is released exactly once: after it has been
/// written out, on [`close`](Self::close), or on drop.
pub struct GraphRepresentation {
    media_type: MediaType,
    source: Option<Box<dyn Read + Send>>,
}

impl GraphRepresentation {
    pub fn new(media_type: MediaType, source: impl Read + Send + 'static) -> Self {
        Self {
            media_type,
            source: Some(Box::new(source)),
        }
    }

    /// A representation backed by an in-memory buffer.
    pub fn from_bytes(media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self::new(media_type, Cursor::new(bytes))
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// `true` once the underlying reader has been released.
    pub fn is_released(&self) -> bool {
        self.source.is_none()
    }

    /// Copies the representation into `out` and releases the reader.
    ///
    /// Returns the number of bytes written; 0 if already released.
    pub fn write_to(&mut self, out: &mut dyn Write) -> Result<u64> {
        match self.source.take() {
            Some(mut source) => {
                let written = std::io::copy(&mut source, out)?;
                out.flush()?;
                Ok(written)
            }
            None => Ok(0),
        }
    }

    /// Releases the reader without writing it. Idempotent.
    pub fn close(&mut self) {
        self.source.take();
    }

    /// Consumes the representation into a byte buffer.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for GraphRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRepresentation")
            .field("media_type", &self.media_type.to_string())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type::known;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        drops: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for CountingReader {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(body: &str) -> (GraphRepresentation, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let reader = CountingReader {
            inner: Cursor::new(body.as_bytes().to_vec()),
            drops: drops.clone(),
        };
        (GraphRepresentation::new(known::n_triples(), reader), drops)
    }

    #[test]
    fn test_write_releases_once() {
        let (mut repr, drops) = counting("<a> <b> <c> .\n");
        let mut out = Vec::new();
        assert_eq!(repr.write_to(&mut out).unwrap(), 14);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(repr.is_released());

        assert_eq!(repr.write_to(&mut out).unwrap(), 0);
        repr.close();
        drop(repr);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(out, b"<a> <b> <c> .\n");
    }

    #[test]
    fn test_close_without_write_releases_once() {
        let (mut repr, drops) = counting("x");
        repr.close();
        repr.close();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        drop(repr);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_unwritten() {
        let (repr, drops) = counting("x");
        drop(repr);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_bytes() {
        let repr = GraphRepresentation::from_bytes(known::turtle(), b"hello".to_vec());
        assert_eq!(repr.media_type(), &known::turtle());
        assert_eq!(repr.into_bytes().unwrap(), b"hello");
    }
}
