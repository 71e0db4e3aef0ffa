//! Atom 1.0 feed writer with the SDShare extension namespace.

use super::{FeedEvent, FeedHandler, FeedState, FeedWriterFactory, ATOM_NS, SDSHARE_NS};
use crate::dates;
use crate::error::{Error, Result};
use crate::graph::Resource;
use crate::media_type::{known, MediaType};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::Write;

/// The character encoding declared in the XML prolog.
///
/// Characters outside the encoding's repertoire are written as numeric
/// character references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlEncoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl XmlEncoding {
    /// The name used in the XML declaration.
    pub fn label(&self) -> &'static str {
        match self {
            XmlEncoding::Utf8 => "utf-8",
            XmlEncoding::Latin1 => "iso-8859-1",
            XmlEncoding::Ascii => "us-ascii",
        }
    }

    fn max_code_point(&self) -> u32 {
        match self {
            XmlEncoding::Utf8 => char::MAX as u32,
            XmlEncoding::Latin1 => 0xFF,
            XmlEncoding::Ascii => 0x7F,
        }
    }

    fn encode<'a>(&self, s: &'a str) -> Cow<'a, [u8]> {
        match self {
            XmlEncoding::Latin1 if !s.is_ascii() => {
                // Escaping guarantees every char fits in one byte.
                Cow::Owned(s.chars().map(|c| c as u32 as u8).collect())
            }
            _ => Cow::Borrowed(s.as_bytes()),
        }
    }
}

/// Escapes `text` for use in XML content or a double-quoted attribute.
///
/// Each Unicode scalar value outside the encoding becomes exactly one
/// reference, so supplementary characters are never split into surrogates.
pub fn escape_xml(text: &str, encoding: XmlEncoding) -> String {
    let mut out = String::with_capacity(text.len());
    let max = encoding.max_code_point();
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c if c as u32 > max => {
                let _ = write!(out, "&#x{:X};", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Streams one Atom document to `W`.
pub struct AtomWriter<W: Write> {
    out: W,
    encoding: XmlEncoding,
    state: FeedState,
    depth: usize,
}

impl<W: Write> AtomWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_encoding(out, XmlEncoding::Utf8)
    }

    pub fn with_encoding(out: W, encoding: XmlEncoding) -> Self {
        Self {
            out,
            encoding,
            state: FeedState::new(),
            depth: 0,
        }
    }

    /// Returns the underlying output.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn esc(&self, text: &str) -> String {
        escape_xml(text, self.encoding)
    }

    fn line(&mut self, markup: &str) -> Result<()> {
        let mut s = "  ".repeat(self.depth);
        s.push_str(markup);
        s.push('\n');
        let bytes = self.encoding.encode(&s);
        self.out.write_all(&bytes)?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        let markup = format!("<{}>{}</{}>", name, self.esc(text), name);
        self.line(&markup)
    }

    fn header(&mut self, id: &str, title: &str, updated: i64) -> Result<()> {
        let updated = dates::to_atom_date(updated)
            .ok_or_else(|| Error::IllegalArgument(format!("time out of range: {}", updated)))?;
        self.text_element("id", id)?;
        self.text_element("title", title)?;
        self.text_element("updated", &updated)
    }
}

impl<W: Write> FeedHandler for AtomWriter<W> {
    fn start_feed(&mut self, id: &str, title: &str, updated: i64) -> Result<()> {
        self.state.apply(FeedEvent::StartFeed)?;
        let prolog = format!("<?xml version=\"1.0\" encoding=\"{}\"?>", self.encoding.label());
        self.line(&prolog)?;
        let root = format!("<feed xmlns=\"{}\" xmlns:sd=\"{}\">", ATOM_NS, SDSHARE_NS);
        self.line(&root)?;
        self.depth = 1;
        self.header(id, title, updated)
    }

    fn link(&mut self, href: &str, rel: &str, media_type: Option<&MediaType>) -> Result<()> {
        self.state.apply(FeedEvent::Link)?;
        let mut markup = format!("<link href=\"{}\" rel=\"{}\"", self.esc(href), self.esc(rel));
        if let Some(mt) = media_type {
            let _ = write!(markup, " type=\"{}\"", self.esc(&mt.to_string()));
        }
        markup.push_str("/>");
        self.line(&markup)
    }

    fn author(&mut self, name: &str, email: Option<&str>, uri: Option<&str>) -> Result<()> {
        self.state.apply(FeedEvent::Author)?;
        let mut markup = format!("<author><name>{}</name>", self.esc(name));
        if let Some(email) = email {
            let _ = write!(markup, "<email>{}</email>", self.esc(email));
        }
        if let Some(uri) = uri {
            let _ = write!(markup, "<uri>{}</uri>", self.esc(uri));
        }
        markup.push_str("</author>");
        self.line(&markup)
    }

    fn generator(&mut self, name: &str, uri: Option<&str>, version: Option<&str>) -> Result<()> {
        self.state.apply(FeedEvent::Generator)?;
        let mut markup = String::from("<generator");
        if let Some(uri) = uri {
            let _ = write!(markup, " uri=\"{}\"", self.esc(uri));
        }
        if let Some(version) = version {
            let _ = write!(markup, " version=\"{}\"", self.esc(version));
        }
        let _ = write!(markup, ">{}</generator>", self.esc(name));
        self.line(&markup)
    }

    fn resource(&mut self, resource: &Resource) -> Result<()> {
        self.state.apply(FeedEvent::Resource)?;
        let markup = match resource.role.as_feed_value() {
            Some(role) => format!(
                "<sd:resource role=\"{}\">{}</sd:resource>",
                role,
                self.esc(&resource.uri)
            ),
            None => format!("<sd:resource>{}</sd:resource>", self.esc(&resource.uri)),
        };
        self.line(&markup)
    }

    fn summary(&mut self, text: &str) -> Result<()> {
        self.state.apply(FeedEvent::Summary)?;
        self.text_element("summary", text)
    }

    fn start_entry(&mut self, id: &str, title: &str, updated: i64) -> Result<()> {
        self.state.apply(FeedEvent::StartEntry)?;
        self.line("<entry>")?;
        self.depth = 2;
        self.header(id, title, updated)
    }

    fn end_entry(&mut self) -> Result<()> {
        self.state.apply(FeedEvent::EndEntry)?;
        self.depth = 1;
        self.line("</entry>")
    }

    fn end_feed(&mut self) -> Result<()> {
        self.state.apply(FeedEvent::EndFeed)?;
        self.depth = 0;
        self.line("</feed>")?;
        self.out.flush()?;
        log::debug!("atom feed finalized");
        Ok(())
    }
}

/// Creates [`AtomWriter`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomWriterFactory {
    pub encoding: XmlEncoding,
}

impl FeedWriterFactory for AtomWriterFactory {
    fn name(&self) -> &str {
        "atom"
    }

    fn media_type(&self) -> MediaType {
        known::atom()
    }

    fn create<'a>(&self, out: Box<dyn Write + Send + 'a>) -> Box<dyn FeedHandler + Send + 'a> {
        Box::new(AtomWriter::with_encoding(out, self.encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceRole;

    #[test]
    fn test_escape_markup() {
        assert_eq!(
            escape_xml("a & b < c > \"d\"", XmlEncoding::Utf8),
            "a &amp; b &lt; c &gt; &quot;d&quot;"
        );
    }

    #[test]
    fn test_escape_non_representable() {
        assert_eq!(escape_xml("café", XmlEncoding::Utf8), "café");
        assert_eq!(escape_xml("café", XmlEncoding::Latin1), "café");
        assert_eq!(escape_xml("café", XmlEncoding::Ascii), "caf&#xE9;");
        assert_eq!(escape_xml("€", XmlEncoding::Latin1), "&#x20AC;");
    }

    #[test]
    fn test_supplementary_character_is_one_reference() {
        // U+1D11E MUSICAL SYMBOL G CLEF, a surrogate pair in UTF-16.
        assert_eq!(escape_xml("\u{1D11E}", XmlEncoding::Ascii), "&#x1D11E;");
        assert_eq!(escape_xml("\u{1D11E}", XmlEncoding::Latin1), "&#x1D11E;");
        assert_eq!(escape_xml("\u{1D11E}", XmlEncoding::Utf8), "\u{1D11E}");
    }

    #[test]
    fn test_feed_document() {
        let mut writer = AtomWriter::new(Vec::new());
        writer.start_feed("f1", "T & Co", 1000).unwrap();
        writer.link("u1", "self", None).unwrap();
        writer.generator("Cassa", Some("http://example.org/"), Some("1.0")).unwrap();
        writer.start_entry("e1", "E", 2000).unwrap();
        writer
            .link("http://ex.org/g", "alternate", Some(&known::xtm()))
            .unwrap();
        writer
            .resource(&Resource::new("http://ex.org/t", ResourceRole::SubjectIdentifier))
            .unwrap();
        writer.author("A", Some("a@example.org"), None).unwrap();
        writer.end_entry().unwrap();
        writer.end_feed().unwrap();

        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(xml.contains(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\" xmlns:sd=\"http://www.sdshare.org/2012/core/\">"
        ));
        assert!(xml.contains("<title>T &amp; Co</title>"));
        assert!(xml.contains("<updated>1970-01-01T00:00:01.000Z</updated>"));
        assert!(xml.contains("<link href=\"u1\" rel=\"self\"/>"));
        assert!(xml.contains(
            "<generator uri=\"http://example.org/\" version=\"1.0\">Cassa</generator>"
        ));
        assert!(xml.contains(
            "<link href=\"http://ex.org/g\" rel=\"alternate\" type=\"application/x-tm+xtm\"/>"
        ));
        assert!(xml.contains(
            "<sd:resource role=\"subject-identifier\">http://ex.org/t</sd:resource>"
        ));
        assert!(xml.contains("<author><name>A</name><email>a@example.org</email></author>"));
        assert!(xml.trim_end().ends_with("</feed>"));
    }

    #[test]
    fn test_latin1_output_bytes() {
        let mut writer = AtomWriter::with_encoding(Vec::new(), XmlEncoding::Latin1);
        writer.start_feed("f", "é€", 0).unwrap();
        writer.end_feed().unwrap();
        let bytes = writer.into_inner();
        assert!(bytes.windows(2).any(|w| w == [b'>', 0xE9]));
        let text: String = bytes.iter().map(|&b| b as char).collect();
        assert!(text.contains("<title>é&#x20AC;</title>"));
    }

    #[test]
    fn test_events_after_end_rejected() {
        let mut writer = AtomWriter::new(Vec::new());
        writer.start_feed("f", "t", 0).unwrap();
        writer.end_feed().unwrap();
        assert!(matches!(writer.end_feed(), Err(Error::Internal(_))));
        assert!(writer.link("x", "self", None).is_err());
    }
}
