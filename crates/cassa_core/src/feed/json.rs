//! JSON rendition of SDShare feeds.
//!
//! The document mirrors the Atom shape: feed and entry objects carry `id`,
//! `title` and `updated` members, grouped events become the arrays `links`,
//! `authors`, `resources` and `entries`.

use super::{FeedEvent, FeedHandler, FeedState, FeedWriterFactory, Step};
use crate::dates;
use crate::error::{Error, Result};
use crate::graph::Resource;
use crate::media_type::{known, MediaType};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct LinkRef<'a> {
    href: &'a str,
    rel: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
}

#[derive(Serialize)]
struct AuthorRef<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
}

#[derive(Serialize)]
struct GeneratorRef<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

#[derive(Serialize)]
struct ResourceRef<'a> {
    uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
}

/// Streams one JSON feed document to `W`.
///
/// Each open object or array is a frame on a stack that records whether a
/// separator is needed before the next member.
pub struct JsonWriter<W: Write> {
    out: W,
    state: FeedState,
    frames: Vec<bool>,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            state: FeedState::new(),
            frames: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn raw(&mut self, s: &str) -> Result<()> {
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }

    fn separator(&mut self) -> Result<()> {
        let needs_comma = match self.frames.last_mut() {
            Some(has_items) => std::mem::replace(has_items, true),
            None => false,
        };
        if needs_comma {
            self.raw(",")?;
        }
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<()> {
        self.separator()?;
        serde_json::to_writer(&mut self.out, key)?;
        self.raw(":")
    }

    fn member<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.key(key)?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    fn element<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.separator()?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    fn open(&mut self, opening: &str) -> Result<()> {
        self.raw(opening)?;
        self.frames.push(false);
        Ok(())
    }

    fn close(&mut self, closing: &str) -> Result<()> {
        self.frames.pop();
        self.raw(closing)
    }

    fn transition(&mut self, event: FeedEvent) -> Result<()> {
        let Step { closed, opened } = self.state.apply(event)?;
        if closed.is_some() {
            self.close("]")?;
        }
        if let Some(group) = opened {
            self.key(group.key())?;
            self.open("[")?;
        }
        Ok(())
    }

    fn header(&mut self, id: &str, title: &str, updated: i64) -> Result<()> {
        let updated = dates::to_atom_date(updated)
            .ok_or_else(|| Error::IllegalArgument(format!("time out of range: {}", updated)))?;
        self.member("id", &id)?;
        self.member("title", &title)?;
        self.member("updated", &updated)
    }
}

impl<W: Write> FeedHandler for JsonWriter<W> {
    fn start_feed(&mut self, id: &str, title: &str, updated: i64) -> Result<()> {
        self.transition(FeedEvent::StartFeed)?;
        self.open("{")?;
        self.header(id, title, updated)
    }

    fn link(&mut self, href: &str, rel: &str, media_type: Option<&MediaType>) -> Result<()> {
        self.transition(FeedEvent::Link)?;
        self.element(&LinkRef {
            href,
            rel,
            media_type: media_type.map(ToString::to_string),
        })
    }

    fn author(&mut self, name: &str, email: Option<&str>, uri: Option<&str>) -> Result<()> {
        self.transition(FeedEvent::Author)?;
        self.element(&AuthorRef { name, email, uri })
    }

    fn generator(&mut self, name: &str, uri: Option<&str>, version: Option<&str>) -> Result<()> {
        self.transition(FeedEvent::Generator)?;
        self.member("generator", &GeneratorRef { name, uri, version })
    }

    fn resource(&mut self, resource: &Resource) -> Result<()> {
        self.transition(FeedEvent::Resource)?;
        self.element(&ResourceRef {
            uri: &resource.uri,
            role: resource.role.as_feed_value(),
        })
    }

    fn summary(&mut self, text: &str) -> Result<()> {
        self.transition(FeedEvent::Summary)?;
        self.member("summary", &text)
    }

    fn start_entry(&mut self, id: &str, title: &str, updated: i64) -> Result<()> {
        self.transition(FeedEvent::StartEntry)?;
        self.separator()?;
        self.open("{")?;
        self.header(id, title, updated)
    }

    fn end_entry(&mut self) -> Result<()> {
        self.transition(FeedEvent::EndEntry)?;
        self.close("}")
    }

    fn end_feed(&mut self) -> Result<()> {
        self.transition(FeedEvent::EndFeed)?;
        self.close("}")?;
        self.out.flush()?;
        log::debug!("json feed finalized");
        Ok(())
    }
}

/// Creates [`JsonWriter`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriterFactory;

impl FeedWriterFactory for JsonWriterFactory {
    fn name(&self) -> &str {
        "json"
    }

    fn media_type(&self) -> MediaType {
        known::json()
    }

    fn create<'a>(&self, out: Box<dyn Write + Send + 'a>) -> Box<dyn FeedHandler + Send + 'a> {
        Box::new(JsonWriter::new(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceRole;
    use serde_json::{json, Value};

    fn parse(writer: JsonWriter<Vec<u8>>) -> Value {
        serde_json::from_slice(&writer.into_inner()).unwrap()
    }

    #[test]
    fn test_grouping_scenario() {
        let mut w = JsonWriter::new(Vec::new());
        w.start_feed("f1", "T", 1000).unwrap();
        w.link("u1", "self", None).unwrap();
        w.link("u2", "next", None).unwrap();
        w.start_entry("e1", "E", 2000).unwrap();
        w.author("A", None, None).unwrap();
        w.end_entry().unwrap();
        w.end_feed().unwrap();

        let doc = parse(w);
        assert_eq!(doc["id"], "f1");
        assert_eq!(doc["updated"], "1970-01-01T00:00:01.000Z");
        assert_eq!(
            doc["links"],
            json!([{"href": "u1", "rel": "self"}, {"href": "u2", "rel": "next"}])
        );
        let entries = doc["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], "e1");
        assert_eq!(entries[0]["authors"], json!([{"name": "A"}]));
    }

    #[test]
    fn test_members_and_resources() {
        let mut w = JsonWriter::new(Vec::new());
        w.start_feed("f", "Feed \"quoted\"", 0).unwrap();
        w.generator("Cassa", None, Some("0.6")).unwrap();
        w.summary("line\nbreak").unwrap();
        w.start_entry("e1", "E1", 0).unwrap();
        w.link("http://ex.org/g", "alternate", Some(&known::n_triples()))
            .unwrap();
        w.resource(&Resource::new("http://ex.org/a", ResourceRole::ItemIdentifier))
            .unwrap();
        w.resource(&Resource::plain("http://ex.org/b")).unwrap();
        w.end_entry().unwrap();
        w.start_entry("e2", "E2", 0).unwrap();
        w.end_entry().unwrap();
        w.end_feed().unwrap();

        let doc = parse(w);
        assert_eq!(doc["title"], "Feed \"quoted\"");
        assert_eq!(doc["generator"], json!({"name": "Cassa", "version": "0.6"}));
        assert_eq!(doc["summary"], "line\nbreak");
        let entries = doc["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0]["links"][0]["type"],
            "application/n-triples"
        );
        assert_eq!(
            entries[0]["resources"],
            json!([
                {"uri": "http://ex.org/a", "role": "item-identifier"},
                {"uri": "http://ex.org/b"}
            ])
        );
        assert_eq!(entries[1]["id"], "e2");
        assert!(entries[1].get("links").is_none());
    }

    #[test]
    fn test_empty_feed() {
        let mut w = JsonWriter::new(Vec::new());
        w.start_feed("f", "t", 0).unwrap();
        w.end_feed().unwrap();
        let doc = parse(w);
        assert!(doc.get("entries").is_none());
        assert_eq!(doc["title"], "t");
    }

    #[test]
    fn test_factory_writes_through_box() {
        let mut buf = Vec::new();
        {
            let mut handler = JsonWriterFactory.create(Box::new(&mut buf));
            handler.start_feed("f", "t", 0).unwrap();
            handler.end_feed().unwrap();
        }
        let doc: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(doc["id"], "f");
    }
}
