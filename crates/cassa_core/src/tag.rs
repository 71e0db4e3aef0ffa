//! RFC 4151 `tag:` URIs for feed and entry identifiers.
//!
//! Identifiers have the form
//! `tag:{domain},{yyyy-mm-dd}:cassa:{epoch-millis}:{kind}:{id}`. The time is
//! always supplied by the caller so the same inputs mint the same IRI.

use crate::dates;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("domain pattern is valid")
});

/// The kind of feed item an IRI identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Collection,
    Fragment,
    Snapshot,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Collection => "collection",
            TagKind::Fragment => "fragment",
            TagKind::Snapshot => "snapshot",
        }
    }
}

/// Mints tag URIs for one authority domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUriGenerator {
    domain: String,
}

impl TagUriGenerator {
    /// Creates a generator for `domain`, e.g. `"semagia.com"`.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalArgument`] unless `domain` has at least two labels.
    pub fn new(domain: impl Into<String>) -> Result<Self> {
        let domain = domain.into();
        if !DOMAIN_PATTERN.is_match(&domain) {
            return Err(Error::IllegalArgument(format!(
                "invalid tag URI domain: {:?}",
                domain
            )));
        }
        Ok(Self { domain })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Mints an IRI of the given kind.
    pub fn generate(&self, kind: TagKind, time: i64, id: &str) -> Result<String> {
        if id.is_empty() {
            return Err(Error::IllegalArgument(
                "tag URI id must not be empty".to_string(),
            ));
        }
        let date = dates::to_tag_date(time)
            .ok_or_else(|| Error::IllegalArgument(format!("time out of range: {}", time)))?;
        Ok(format!(
            "tag:{},{}:cassa:{}:{}:{}",
            self.domain,
            date,
            time,
            kind.as_str(),
            id
        ))
    }

    pub fn generate_collection_iri(&self, time: i64, id: &str) -> Result<String> {
        self.generate(TagKind::Collection, time, id)
    }

    pub fn generate_fragment_iri(&self, time: i64, id: &str) -> Result<String> {
        self.generate(TagKind::Fragment, time, id)
    }

    pub fn generate_snapshot_iri(&self, time: i64, id: &str) -> Result<String> {
        self.generate(TagKind::Snapshot, time, id)
    }
}
