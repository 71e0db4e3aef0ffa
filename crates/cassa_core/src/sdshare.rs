//! SDShare collection, fragments and snapshots feeds.
//!
//! A [`FeedProducer`] walks the store and drives a [`FeedHandler`]; the
//! handler decides the output format.

use crate::error::Result;
use crate::feed::{FeedHandler, REL_COLLECTION_FEED, REL_FRAGMENTS_FEED, REL_SNAPSHOTS_FEED};
use crate::graph::{GraphInfo, GraphRef};
use crate::protocol::ServiceEndpoint;
use crate::store::Store;
use crate::tag::TagUriGenerator;

const GENERATOR_NAME: &str = "Cassa";

/// Feed timestamps must be real instants; unknown times render as the epoch.
fn feed_time(last_modification: i64) -> i64 {
    last_modification.max(0)
}

/// Produces the SDShare feeds of one store.
pub struct FeedProducer<'a> {
    store: &'a dyn Store,
    endpoint: &'a ServiceEndpoint,
    tags: &'a TagUriGenerator,
    title: &'a str,
}

impl<'a> FeedProducer<'a> {
    pub fn new(
        store: &'a dyn Store,
        endpoint: &'a ServiceEndpoint,
        tags: &'a TagUriGenerator,
        title: &'a str,
    ) -> Self {
        Self {
            store,
            endpoint,
            tags,
            title,
        }
    }

    /// The collection feed: one entry per graph, linking to its fragments
    /// and snapshots feeds.
    pub fn collection_feed(&self, handler: &mut dyn FeedHandler) -> Result<()> {
        let updated = feed_time(self.store.last_modification()?);
        let self_uri = self.endpoint.collection_feed_uri();
        let id = self.tags.generate_collection_iri(updated, &self_uri)?;

        handler.start_feed(&id, self.title, updated)?;
        handler.link(&self_uri, "self", None)?;
        handler.generator(GENERATOR_NAME, None, Some(env!("CARGO_PKG_VERSION")))?;

        let mut count = 0usize;
        for info in self.store.graph_infos()? {
            self.collection_entry(handler, &info)?;
            count += 1;
        }
        handler.end_feed()?;
        log::debug!("collection feed with {} graphs", count);
        Ok(())
    }

    fn collection_entry(&self, handler: &mut dyn FeedHandler, info: &GraphInfo) -> Result<()> {
        let graph = info.graph();
        let link = self.endpoint.link_for(graph);
        handler.start_entry(
            &link,
            info.title().unwrap_or(link.as_str()),
            feed_time(info.last_modification()),
        )?;
        handler.link(&self.endpoint.fragments_feed_uri(graph), REL_FRAGMENTS_FEED, None)?;
        handler.link(&self.endpoint.snapshots_feed_uri(graph), REL_SNAPSHOTS_FEED, None)?;
        if let Some(description) = info.description() {
            handler.summary(description)?;
        }
        handler.end_entry()
    }

    /// The fragments feed of `graph`: one entry per change after `since`,
    /// oldest first.
    pub fn fragments_feed(
        &self,
        handler: &mut dyn FeedHandler,
        graph: &GraphRef,
        since: i64,
    ) -> Result<()> {
        let info = self.store.graph_info(graph)?;
        let fragments = self.store.fragment_infos(graph, since)?;
        let updated = feed_time(
            fragments
                .last()
                .map(|f| f.info().last_modification())
                .unwrap_or_else(|| info.last_modification()),
        );
        let self_uri = self.endpoint.fragments_feed_uri(graph);
        let link = self.endpoint.link_for(graph);

        handler.start_feed(&self_uri, &format!("Fragments of {}", link), updated)?;
        handler.link(&self_uri, "self", None)?;
        handler.link(
            &self.endpoint.collection_feed_uri(),
            REL_COLLECTION_FEED,
            None,
        )?;
        for fragment in &fragments {
            let time = feed_time(fragment.info().last_modification());
            let id = self
                .tags
                .generate_fragment_iri(time, &format!("{}:{}", fragment.sequence(), link))?;
            handler.start_entry(&id, &link, time)?;
            handler.link(&link, "alternate", fragment.info().preferred_media_type())?;
            for resource in fragment.resources() {
                handler.resource(resource)?;
            }
            handler.end_entry()?;
        }
        handler.end_feed()?;
        log::debug!("fragments feed for {} with {} entries", graph, fragments.len());
        Ok(())
    }

    /// The snapshots feed of `graph`: a single entry for its current state
    /// with one alternate link per served media type.
    pub fn snapshots_feed(&self, handler: &mut dyn FeedHandler, graph: &GraphRef) -> Result<()> {
        let info = self.store.graph_info(graph)?;
        let updated = feed_time(info.last_modification());
        let self_uri = self.endpoint.snapshots_feed_uri(graph);
        let link = self.endpoint.link_for(graph);

        handler.start_feed(&self_uri, &format!("Snapshots of {}", link), updated)?;
        handler.link(&self_uri, "self", None)?;
        handler.link(
            &self.endpoint.collection_feed_uri(),
            REL_COLLECTION_FEED,
            None,
        )?;
        let id = self.tags.generate_snapshot_iri(updated, &link)?;
        handler.start_entry(&id, info.title().unwrap_or(link.as_str()), updated)?;
        for media_type in info.supported_media_types() {
            handler.link(&link, "alternate", Some(media_type))?;
        }
        handler.end_entry()?;
        handler.end_feed()
    }
}

#[cfg(all(test, feature = "memory-backend"))]
mod tests {
    use super::*;
    use crate::backends::MemoryStore;
    use crate::error::Error;
    use crate::feed::JsonWriter;
    use crate::media_type::known;
    use crate::store::ModifiableStore;
    use serde_json::Value;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    const A: &str = "<http://ex.org/a> <http://ex.org/p> \"1\" .";
    const B: &str = "<http://ex.org/b> <http://ex.org/p> \"2\" .";

    struct Fixture {
        store: MemoryStore,
        endpoint: ServiceEndpoint,
        tags: TagUriGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            let ticks = Arc::new(AtomicI64::new(1_000_000_000_000));
            Self {
                store: MemoryStore::with_clock(Arc::new(move || {
                    ticks.fetch_add(1000, Ordering::SeqCst)
                })),
                endpoint: ServiceEndpoint::new("http://localhost:8080/").unwrap(),
                tags: TagUriGenerator::new("semagia.com").unwrap(),
            }
        }

        fn put(&self, uri: &str, body: &str) {
            self.store
                .create_or_replace_graph(
                    &GraphRef::named(uri),
                    &mut body.as_bytes(),
                    None,
                    &known::n_triples(),
                )
                .unwrap();
        }

        fn render(&self, f: impl FnOnce(&FeedProducer, &mut dyn FeedHandler) -> Result<()>) -> Value {
            let producer = FeedProducer::new(&self.store, &self.endpoint, &self.tags, "Test");
            let mut writer = JsonWriter::new(Vec::new());
            f(&producer, &mut writer).unwrap();
            serde_json::from_slice(&writer.into_inner()).unwrap()
        }
    }

    #[test]
    fn test_collection_feed() {
        let fx = Fixture::new();
        fx.put("http://localhost:8080/g/one", A);
        fx.put("http://example.org/two", B);
        fx.store
            .describe_graph(&GraphRef::named("http://localhost:8080/g/one"), Some("One"), Some("First"))
            .unwrap();

        let doc = fx.render(|p, h| p.collection_feed(h));
        assert_eq!(doc["title"], "Test");
        assert_eq!(
            doc["id"],
            "tag:semagia.com,2001-09-09:cassa:1000000001000:collection:http://localhost:8080/feeds"
        );
        assert_eq!(doc["links"][0]["rel"], "self");
        assert_eq!(doc["generator"]["name"], "Cassa");

        let entries = doc["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["id"], "http://localhost:8080/g/one");
        assert_eq!(entries[0]["title"], "One");
        assert_eq!(entries[0]["summary"], "First");
        assert_eq!(entries[0]["links"][0]["rel"], REL_FRAGMENTS_FEED);
        assert_eq!(entries[0]["links"][1]["rel"], REL_SNAPSHOTS_FEED);
        assert_eq!(
            entries[1]["id"],
            "http://localhost:8080/service?graph=http%3A%2F%2Fexample.org%2Ftwo"
        );
    }

    #[test]
    fn test_fragments_feed() {
        let fx = Fixture::new();
        let uri = "http://localhost:8080/g/one";
        fx.put(uri, A);
        fx.put(uri, &format!("{}\n{}", A, B));

        let doc = fx.render(|p, h| p.fragments_feed(h, &GraphRef::named(uri), -1));
        let entries = doc["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1]["id"],
            "tag:semagia.com,2001-09-09:cassa:1000000001000:fragment:2:http://localhost:8080/g/one"
        );
        assert_eq!(entries[1]["links"][0]["rel"], "alternate");
        assert_eq!(entries[1]["resources"][0]["uri"], "http://ex.org/b");

        let doc = fx.render(|p, h| p.fragments_feed(h, &GraphRef::named(uri), 1_000_000_000_000));
        assert_eq!(doc["entries"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_fragment_ids_unique_within_a_millisecond() {
        let fx = Fixture {
            store: MemoryStore::with_clock(Arc::new(|| 1_000_000_000_000i64)),
            ..Fixture::new()
        };
        let uri = "http://localhost:8080/g/one";
        fx.put(uri, A);
        fx.put(uri, B);

        let doc = fx.render(|p, h| p.fragments_feed(h, &GraphRef::named(uri), -1));
        let entries = doc["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["updated"], entries[1]["updated"]);
        assert_ne!(entries[0]["id"], entries[1]["id"]);
    }

    #[test]
    fn test_snapshots_feed() {
        let fx = Fixture::new();
        fx.put("http://localhost:8080/g/one", A);
        let doc = fx.render(|p, h| p.snapshots_feed(h, &GraphRef::named("http://localhost:8080/g/one")));
        let entries = doc["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        let links = entries[0]["links"].as_array().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0]["type"], "application/n-triples");
        assert_eq!(links[1]["type"], "text/plain");
    }

    #[test]
    fn test_default_graph_feeds() {
        let fx = Fixture::new();
        let doc = fx.render(|p, h| p.snapshots_feed(h, &GraphRef::Default));
        assert_eq!(doc["id"], "http://localhost:8080/feeds/snapshots?default");
        assert_eq!(doc["updated"], "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_missing_graph() {
        let fx = Fixture::new();
        let producer = FeedProducer::new(&fx.store, &fx.endpoint, &fx.tags, "Test");
        let mut writer = JsonWriter::new(Vec::new());
        assert!(matches!(
            producer.fragments_feed(&mut writer, &GraphRef::named("urn:none"), 0),
            Err(Error::GraphNotExists(_))
        ));
    }
}
