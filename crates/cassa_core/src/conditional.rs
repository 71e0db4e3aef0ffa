//! Conditional GET/HEAD evaluation.

use crate::dates;
use crate::graph::UNKNOWN_MODIFICATION;
use crate::media_type::split_unquoted;

/// The conditional request headers relevant for reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    if_none_match: Option<Vec<String>>,
    if_modified_since: Option<i64>,
}

impl Preconditions {
    /// No preconditions; every request is served in full.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds preconditions from raw header values.
    ///
    /// An unparsable `If-Modified-Since` is ignored, as RFC 7232 requires.
    pub fn from_headers(if_none_match: Option<&str>, if_modified_since: Option<&str>) -> Self {
        Self {
            if_none_match: if_none_match.map(parse_entity_tags),
            if_modified_since: if_modified_since.and_then(dates::parse_http_date),
        }
    }

    /// Adds an `If-None-Match` tag list.
    pub fn with_if_none_match(mut self, header: &str) -> Self {
        self.if_none_match = Some(parse_entity_tags(header));
        self
    }

    /// Adds an `If-Modified-Since` time in epoch milliseconds.
    pub fn with_if_modified_since(mut self, millis: i64) -> Self {
        self.if_modified_since = Some(millis);
        self
    }

    /// `true` if no conditional header was given.
    pub fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none()
    }

    /// Decides whether a GET/HEAD can be answered with "not modified".
    ///
    /// `If-None-Match` takes precedence; `If-Modified-Since` is only
    /// consulted when it is absent and compares at second resolution.
    pub fn is_not_modified(&self, etag: Option<&str>, last_modification: i64) -> bool {
        if let Some(tags) = &self.if_none_match {
            return tags.iter().any(|tag| match tag.as_str() {
                "*" => etag.is_some(),
                tag => etag == Some(tag),
            });
        }
        match self.if_modified_since {
            Some(since) if last_modification != UNKNOWN_MODIFICATION => {
                last_modification / 1000 <= since / 1000
            }
            _ => false,
        }
    }
}

/// Splits an `If-None-Match` header into opaque tags without quotes or `W/`.
fn parse_entity_tags(header: &str) -> Vec<String> {
    split_unquoted(header, ',')
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            let t = t.strip_prefix("W/").unwrap_or(t);
            t.trim_matches('"').to_string()
        })
        .collect()
}

/// Formats an ETag header value.
pub fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}
