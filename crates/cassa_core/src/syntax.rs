//! Registry of the serialization syntaxes known to Cassa.
//!
//! The table is built once by [`SyntaxRegistry::standard`] and handed to the
//! protocol layer by reference. All lookups are case-insensitive and never
//! fail: a miss yields `None` or the caller's default.

use crate::media_type::{known, MediaType};
use std::collections::HashMap;

/// A graph serialization syntax.
///
/// The first element of each list is the syntax' canonical default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    name: String,
    media_types: Vec<MediaType>,
    extensions: Vec<String>,
    identifiers: Vec<String>,
}

impl Syntax {
    /// Creates a syntax. Every list must contain at least one element.
    pub fn new(
        name: impl Into<String>,
        media_types: Vec<MediaType>,
        extensions: &[&str],
        identifiers: &[&str],
    ) -> Self {
        debug_assert!(!media_types.is_empty());
        debug_assert!(!extensions.is_empty());
        debug_assert!(!identifiers.is_empty());
        Self {
            name: name.into(),
            media_types,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            identifiers: identifiers.iter().map(|i| i.to_string()).collect(),
        }
    }

    /// The human-readable name, e.g. `"XTM"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All media types, the default first.
    pub fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    /// All file extensions (without a leading dot), the default first.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// All short identifiers, the default first.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// The canonical media type.
    pub fn default_media_type(&self) -> &MediaType {
        &self.media_types[0]
    }

    /// The canonical file extension.
    pub fn default_extension(&self) -> &str {
        &self.extensions[0]
    }

    /// The canonical identifier.
    pub fn default_identifier(&self) -> &str {
        &self.identifiers[0]
    }
}

/// A fixed table of syntaxes with four case-insensitive indexes.
#[derive(Debug, Clone)]
pub struct SyntaxRegistry {
    syntaxes: Vec<Syntax>,
    by_media_type: HashMap<String, usize>,
    by_extension: HashMap<String, usize>,
    by_identifier: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl SyntaxRegistry {
    /// Builds a registry from `syntaxes`.
    ///
    /// If two syntaxes claim the same key the earlier one wins.
    pub fn new(syntaxes: Vec<Syntax>) -> Self {
        let mut by_media_type = HashMap::new();
        let mut by_extension = HashMap::new();
        let mut by_identifier = HashMap::new();
        let mut by_name = HashMap::new();

        for (idx, syntax) in syntaxes.iter().enumerate() {
            by_name.entry(fold(&syntax.name)).or_insert(idx);
            for mt in &syntax.media_types {
                by_media_type
                    .entry(media_type_key(mt))
                    .or_insert(idx);
            }
            for ext in &syntax.extensions {
                by_extension.entry(fold(ext)).or_insert(idx);
            }
            for id in &syntax.identifiers {
                by_identifier.entry(fold(id)).or_insert(idx);
            }
        }

        log::debug!("syntax registry built with {} syntaxes", syntaxes.len());

        Self {
            syntaxes,
            by_media_type,
            by_extension,
            by_identifier,
            by_name,
        }
    }

    /// Builds the standard Topic Maps and RDF syntax table.
    pub fn standard() -> Self {
        Self::new(vec![
            Syntax::new(
                "XTM",
                vec![
                    known::xtm(),
                    MediaType::from_static("application", "xtm+xml"),
                    MediaType::from_static("application", "x-tm+xml"),
                ],
                &["xtm", "xml"],
                &["xtm", "xtm2"],
            ),
            Syntax::new("CTM", vec![known::ctm()], &["ctm"], &["ctm"]),
            Syntax::new(
                "JTM",
                vec![known::jtm(), MediaType::from_static("application", "jtm+json")],
                &["jtm"],
                &["jtm"],
            ),
            Syntax::new("LTM", vec![known::ltm()], &["ltm"], &["ltm"]),
            Syntax::new(
                "TM/XML",
                vec![known::tmxml()],
                &["tmx", "tmxml"],
                &["tmxml", "tm/xml"],
            ),
            Syntax::new(
                "RDF/XML",
                vec![known::rdf_xml(), MediaType::from_static("application", "xml")],
                &["rdf", "rdfs", "owl"],
                &["rdfxml", "rdf/xml", "rdf"],
            ),
            Syntax::new(
                "Turtle",
                vec![
                    known::turtle(),
                    MediaType::from_static("application", "x-turtle"),
                    MediaType::from_static("application", "turtle"),
                ],
                &["ttl"],
                &["turtle", "ttl"],
            ),
            Syntax::new(
                "N-Triples",
                vec![known::n_triples(), known::text_plain()],
                &["nt"],
                &["ntriples", "n-triples", "nt"],
            ),
            Syntax::new(
                "N3",
                vec![known::n3(), MediaType::from_static("text", "rdf+n3")],
                &["n3"],
                &["n3"],
            ),
            Syntax::new("TriX", vec![known::trix()], &["trix"], &["trix"]),
            Syntax::new(
                "RDF/JSON",
                vec![known::rdf_json()],
                &["rj"],
                &["rdfjson", "rdf/json"],
            ),
            Syntax::new(
                "JSON-LD",
                vec![known::json_ld()],
                &["jsonld"],
                &["jsonld", "json-ld"],
            ),
            Syntax::new(
                "SPARQL Update",
                vec![known::sparql_update()],
                &["ru"],
                &["sparql-update", "sparqlupdate"],
            ),
        ])
    }

    /// All registered syntaxes in registration order.
    pub fn syntaxes(&self) -> &[Syntax] {
        &self.syntaxes
    }

    /// Looks up a syntax by media type; parameters are ignored.
    pub fn for_media_type(&self, media_type: &MediaType) -> Option<&Syntax> {
        self.lookup(&self.by_media_type, &media_type_key(media_type))
    }

    /// Like [`for_media_type`](Self::for_media_type), returning `default` on a miss.
    pub fn for_media_type_or<'a>(&'a self, media_type: &MediaType, default: &'a Syntax) -> &'a Syntax {
        self.for_media_type(media_type).unwrap_or(default)
    }

    /// Looks up a syntax by file extension. A leading dot is ignored.
    pub fn for_file_extension(&self, extension: &str) -> Option<&Syntax> {
        let extension = extension.trim().trim_start_matches('.');
        self.lookup(&self.by_extension, &fold(extension))
    }

    /// Like [`for_file_extension`](Self::for_file_extension), returning `default` on a miss.
    pub fn for_file_extension_or<'a>(&'a self, extension: &str, default: &'a Syntax) -> &'a Syntax {
        self.for_file_extension(extension).unwrap_or(default)
    }

    /// Looks up a syntax by short identifier, e.g. `"ctm"`.
    pub fn for_identifier(&self, identifier: &str) -> Option<&Syntax> {
        self.lookup(&self.by_identifier, &fold(identifier))
    }

    /// Like [`for_identifier`](Self::for_identifier), returning `default` on a miss.
    pub fn for_identifier_or<'a>(&'a self, identifier: &str, default: &'a Syntax) -> &'a Syntax {
        self.for_identifier(identifier).unwrap_or(default)
    }

    /// Looks up a syntax by name, e.g. `"Turtle"`.
    pub fn for_name(&self, name: &str) -> Option<&Syntax> {
        self.lookup(&self.by_name, &fold(name))
    }

    /// Like [`for_name`](Self::for_name), returning `default` on a miss.
    pub fn for_name_or<'a>(&'a self, name: &str, default: &'a Syntax) -> &'a Syntax {
        self.for_name(name).unwrap_or(default)
    }

    fn lookup(&self, index: &HashMap<String, usize>, key: &str) -> Option<&Syntax> {
        index.get(key).map(|&idx| &self.syntaxes[idx])
    }
}

impl Default for SyntaxRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

fn media_type_key(mt: &MediaType) -> String {
    format!("{}/{}", mt.type_(), mt.subtype())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        let registry = SyntaxRegistry::standard();
        let fallback = registry.for_name("Turtle").unwrap();
        let syntax = registry.for_file_extension_or("XTM", fallback);
        assert_eq!(syntax.name(), "XTM");
        assert_eq!(registry.for_file_extension(".Ttl").unwrap().name(), "Turtle");
    }

    #[test]
    fn test_unmatched_lookup_returns_default() {
        let registry = SyntaxRegistry::standard();
        let fallback = registry.for_name("CTM").unwrap();
        assert_eq!(registry.for_file_extension_or("docx", fallback).name(), "CTM");
        assert_eq!(registry.for_identifier_or("nope", fallback).name(), "CTM");
        assert_eq!(registry.for_name_or("nope", fallback).name(), "CTM");
        assert_eq!(
            registry
                .for_media_type_or(&MediaType::new("image", "png").unwrap(), fallback)
                .name(),
            "CTM"
        );
        assert!(registry.for_file_extension("docx").is_none());
    }

    #[test]
    fn test_media_type_lookup_ignores_parameters() {
        let registry = SyntaxRegistry::standard();
        let mt = MediaType::parse("Text/Turtle; charset=utf-8").unwrap();
        assert_eq!(registry.for_media_type(&mt).unwrap().name(), "Turtle");
        let legacy = MediaType::parse("application/x-turtle").unwrap();
        assert_eq!(registry.for_media_type(&legacy).unwrap().name(), "Turtle");
    }

    #[test]
    fn test_index_zero_is_default() {
        let registry = SyntaxRegistry::standard();
        let xtm = registry.for_identifier("XTM2").unwrap();
        assert_eq!(xtm.default_media_type(), &known::xtm());
        assert_eq!(xtm.default_extension(), "xtm");
        assert_eq!(xtm.default_identifier(), "xtm");

        let nt = registry.for_media_type(&known::text_plain()).unwrap();
        assert_eq!(nt.name(), "N-Triples");
        assert_eq!(nt.default_media_type(), &known::n_triples());
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = SyntaxRegistry::standard();
        // "xml" is claimed by XTM as an extension before RDF/XML.
        assert_eq!(registry.for_file_extension("xml").unwrap().name(), "XTM");
        assert_eq!(
            registry
                .for_media_type(&MediaType::new("application", "xml").unwrap())
                .unwrap()
                .name(),
            "RDF/XML"
        );
    }

    #[test]
    fn test_independent_instances() {
        let custom = SyntaxRegistry::new(vec![Syntax::new(
            "Custom",
            vec![MediaType::new("application", "x-custom").unwrap()],
            &["cst"],
            &["custom"],
        )]);
        assert_eq!(custom.syntaxes().len(), 1);
        assert!(custom.for_file_extension("xtm").is_none());
        assert!(SyntaxRegistry::standard().for_file_extension("cst").is_none());
    }
}
