//! Immutable media type values with wildcard-aware matching.
//!
//! A [`MediaType`] is `type/subtype` plus an ordered list of parameters.
//! Type, subtype and parameter keys are lower-cased on construction while
//! parameter values are kept verbatim. The wildcard `*` is only valid for a
//! whole type or a whole subtype (`*/*`, `text/*`).

use crate::error::{Error, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const WILDCARD: &str = "*";

/// An immutable media type such as `application/rdf+xml` or `text/*;q=0.5`.
#[derive(Debug, Clone)]
pub struct MediaType {
    type_: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    /// Creates a media type without parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if either part is not a token, or if
    /// the type is `*` while the subtype is not.
    pub fn new(type_: &str, subtype: &str) -> Result<Self> {
        let type_ = type_.trim().to_ascii_lowercase();
        let subtype = subtype.trim().to_ascii_lowercase();
        if !is_type_token(&type_)
            || !is_type_token(&subtype)
            || (type_ == WILDCARD && subtype != WILDCARD)
        {
            return Err(Error::InvalidFormat(format!("{}/{}", type_, subtype)));
        }
        Ok(Self {
            type_,
            subtype,
            parameters: Vec::new(),
        })
    }

    // Built-in types only; the literals are known to be lower-case tokens.
    pub(crate) fn from_static(type_: &'static str, subtype: &'static str) -> Self {
        debug_assert!(is_type_token(type_) && is_type_token(subtype));
        Self {
            type_: type_.to_string(),
            subtype: subtype.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Returns the `*/*` media type.
    pub fn wildcard() -> Self {
        Self::from_static(WILDCARD, WILDCARD)
    }

    /// Parses a media type string.
    ///
    /// Accepts `*` (read as `*/*`) or `type/subtype[;key=value]*`. Whitespace
    /// around `/`, `;` and `=` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if the string is not a media type.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == WILDCARD {
            return Ok(Self::wildcard());
        }

        let mut segments = split_unquoted(s, ';').into_iter();
        let full_type = segments.next().unwrap_or_default();
        let (type_, subtype) = full_type
            .split_once('/')
            .ok_or_else(|| Error::InvalidFormat(s.to_string()))?;
        let type_ = type_.trim().to_ascii_lowercase();
        let subtype = subtype.trim().to_ascii_lowercase();

        if !is_type_token(&type_) || !is_type_token(&subtype) {
            return Err(Error::InvalidFormat(s.to_string()));
        }
        if type_ == WILDCARD && subtype != WILDCARD {
            return Err(Error::InvalidFormat(s.to_string()));
        }

        let mut parameters: Vec<(String, String)> = Vec::new();
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| Error::InvalidFormat(s.to_string()))?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            let repeated = parameters.iter().any(|(k, _)| *k == key);
            if !is_token(&key) || value.is_empty() || repeated {
                return Err(Error::InvalidFormat(s.to_string()));
            }
            parameters.push((key, value.to_string()));
        }

        Ok(Self {
            type_,
            subtype,
            parameters,
        })
    }

    /// Returns the primary type, e.g. `application`.
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// Returns the subtype, e.g. `rdf+xml`.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Returns the parameters in their original order.
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// Returns the value of the parameter `key` (case-insensitive key).
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a copy with `key` set to `value`, replacing a previous value.
    ///
    /// A value that is not a token is stored as a quoted string, the same
    /// form [`MediaType::parse`] keeps for quoted input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if `key` is not a token.
    pub fn with_parameter(&self, key: &str, value: &str) -> Result<Self> {
        let key = key.trim().to_ascii_lowercase();
        if !is_token(&key) {
            return Err(Error::InvalidFormat(key));
        }
        let value = value.trim();
        let value = if is_token(value) {
            value.to_string()
        } else {
            quote(value)
        };
        let mut parameters: Vec<_> = self
            .parameters
            .iter()
            .filter(|(k, _)| *k != key)
            .cloned()
            .collect();
        parameters.push((key, value));
        Ok(Self {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            parameters,
        })
    }

    /// Returns a copy without any parameters.
    pub fn without_parameters(&self) -> Self {
        Self {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            parameters: Vec::new(),
        }
    }

    /// Returns a copy without the parameter `key`.
    pub fn without_parameter(&self, key: &str) -> Self {
        Self {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            parameters: self
                .parameters
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case(key))
                .cloned()
                .collect(),
        }
    }

    /// `true` if the type is `*`.
    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == WILDCARD
    }

    /// `true` if the subtype is `*`.
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD
    }

    /// Checks whether this media type matches `other`.
    ///
    /// Types match if either side is a wildcard or both are equal; subtypes
    /// likewise. With `include_parameters`, every parameter of `other` must
    /// also be present with the same value on `self`.
    pub fn is_compatible(&self, other: &MediaType, include_parameters: bool) -> bool {
        let types_match =
            self.is_wildcard_type() || other.is_wildcard_type() || self.type_ == other.type_;
        if !types_match {
            return false;
        }
        let subtypes_match = self.is_wildcard_subtype()
            || other.is_wildcard_subtype()
            || self.subtype == other.subtype;
        if !subtypes_match {
            return false;
        }
        !include_parameters
            || other
                .parameters
                .iter()
                .all(|(k, v)| self.parameter(k) == Some(v.as_str()))
    }

    /// Counts the concrete parts of this type: type, subtype and parameters.
    ///
    /// Used to prefer `text/turtle` over `text/*` over `*/*`.
    pub fn specificity(&self) -> usize {
        let mut n = self.parameters.len();
        if !self.is_wildcard_type() {
            n += 1 << 8;
        }
        if !self.is_wildcard_subtype() {
            n += 1 << 4;
        }
        n
    }

    fn sorted_parameters(&self) -> Vec<&(String, String)> {
        let mut params: Vec<_> = self.parameters.iter().collect();
        params.sort();
        params
    }
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.type_ == other.type_
            && self.subtype == other.subtype
            && self.sorted_parameters() == other.sorted_parameters()
    }
}

impl Eq for MediaType {}

impl Hash for MediaType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_.hash(state);
        self.subtype.hash(state);
        self.sorted_parameters().hash(state);
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (key, value) in &self.parameters {
            write!(f, ";{}={}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        MediaType::parse(&s).map_err(de::Error::custom)
    }
}

/// Splits `s` at `sep`, ignoring separators inside double quotes.
pub(crate) fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn is_type_token(s: &str) -> bool {
    s == WILDCARD || (is_token(s) && !s.contains('*'))
}

// RFC 7230 tchar
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`'
                        | '|' | '~'
                )
        })
}

/// Well-known media types.
pub mod known {
    use super::MediaType;

    /// `*/*`
    pub fn any() -> MediaType {
        MediaType::wildcard()
    }

    /// XTM 2.x, `application/x-tm+xtm`
    pub fn xtm() -> MediaType {
        MediaType::from_static("application", "x-tm+xtm")
    }

    /// CTM, `application/x-tm+ctm`
    pub fn ctm() -> MediaType {
        MediaType::from_static("application", "x-tm+ctm")
    }

    /// JTM, `application/x-tm+jtm`
    pub fn jtm() -> MediaType {
        MediaType::from_static("application", "x-tm+jtm")
    }

    /// LTM, `application/x-tm+ltm`
    pub fn ltm() -> MediaType {
        MediaType::from_static("application", "x-tm+ltm")
    }

    /// TM/XML, `application/x-tm+tmxml`
    pub fn tmxml() -> MediaType {
        MediaType::from_static("application", "x-tm+tmxml")
    }

    /// RDF/XML, `application/rdf+xml`
    pub fn rdf_xml() -> MediaType {
        MediaType::from_static("application", "rdf+xml")
    }

    /// Turtle, `text/turtle`
    pub fn turtle() -> MediaType {
        MediaType::from_static("text", "turtle")
    }

    /// N-Triples, `application/n-triples`
    pub fn n_triples() -> MediaType {
        MediaType::from_static("application", "n-triples")
    }

    /// `text/plain`, the legacy N-Triples type
    pub fn text_plain() -> MediaType {
        MediaType::from_static("text", "plain")
    }

    /// N3, `text/n3`
    pub fn n3() -> MediaType {
        MediaType::from_static("text", "n3")
    }

    /// TriX, `application/trix`
    pub fn trix() -> MediaType {
        MediaType::from_static("application", "trix")
    }

    /// RDF/JSON, `application/rdf+json`
    pub fn rdf_json() -> MediaType {
        MediaType::from_static("application", "rdf+json")
    }

    /// JSON-LD, `application/ld+json`
    pub fn json_ld() -> MediaType {
        MediaType::from_static("application", "ld+json")
    }

    /// SPARQL 1.1 Update, `application/sparql-update`
    pub fn sparql_update() -> MediaType {
        MediaType::from_static("application", "sparql-update")
    }

    /// Atom feeds, `application/atom+xml`
    pub fn atom() -> MediaType {
        MediaType::from_static("application", "atom+xml")
    }

    /// Plain JSON, `application/json`
    pub fn json() -> MediaType {
        MediaType::from_static("application", "json")
    }
}
