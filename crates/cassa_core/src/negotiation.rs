//! Content negotiation between client preferences and store capabilities.

use crate::error::{Error, Result};
use crate::media_type::{split_unquoted, MediaType};

/// One element of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    /// The media range, without its `q` parameter.
    pub media_type: MediaType,
    /// Relative quality in `[0, 1]`.
    pub quality: f32,
}

/// A parsed `Accept` header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AcceptList {
    preferences: Vec<Preference>,
}

impl AcceptList {
    /// A list accepting anything (`*/*`).
    pub fn any() -> Self {
        Self::default()
    }

    /// Creates a list from explicit media ranges, all with quality 1.
    pub fn of(media_types: impl IntoIterator<Item = MediaType>) -> Self {
        Self {
            preferences: media_types
                .into_iter()
                .map(|media_type| Preference {
                    media_type,
                    quality: 1.0,
                })
                .collect(),
        }
    }

    /// Parses an `Accept` header value.
    ///
    /// Malformed elements are skipped; an empty header accepts anything.
    pub fn parse(header: &str) -> Self {
        let mut preferences = Vec::new();
        for element in split_unquoted(header, ',') {
            let element = element.trim();
            if element.is_empty() {
                continue;
            }
            let media_type = match MediaType::parse(element) {
                Ok(mt) => mt,
                Err(_) => {
                    log::debug!("ignoring malformed Accept element {:?}", element);
                    continue;
                }
            };
            let quality = match media_type.parameter("q") {
                None => 1.0,
                Some(q) => match q.parse::<f32>() {
                    Ok(q) if q.is_finite() => q.clamp(0.0, 1.0),
                    _ => {
                        log::debug!("ignoring Accept element with bad q-value {:?}", element);
                        continue;
                    }
                },
            };
            preferences.push(Preference {
                media_type: media_type.without_parameter("q"),
                quality,
            });
        }
        Self { preferences }
    }

    /// Parses an optional header; `None` accepts anything.
    pub fn from_header(header: Option<&str>) -> Self {
        header.map(Self::parse).unwrap_or_default()
    }

    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    /// `true` if no preference was stated, i.e. anything is acceptable.
    pub fn is_any(&self) -> bool {
        self.preferences.is_empty()
    }

    /// The quality the client assigns to a concrete `media_type`.
    ///
    /// The most specific matching range decides; no match yields 0.
    pub fn quality_of(&self, media_type: &MediaType) -> f32 {
        if self.preferences.is_empty() {
            return 1.0;
        }
        let mut best: Option<&Preference> = None;
        for pref in &self.preferences {
            if !media_type.is_compatible(&pref.media_type, true) {
                continue;
            }
            let more_specific = best.map_or(true, |b| {
                pref.media_type.specificity() > b.media_type.specificity()
            });
            if more_specific {
                best = Some(pref);
            }
        }
        best.map_or(0.0, |p| p.quality)
    }
}

/// Result of negotiating a representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Negotiated {
    /// The representation to serve.
    Selected(MediaType),
    /// Nothing is acceptable; carries what could have been served.
    NotAcceptable(Vec<MediaType>),
}

impl Negotiated {
    /// Converts a `NotAcceptable` outcome into [`Error::NotAcceptable`].
    pub fn into_result(self) -> Result<MediaType> {
        match self {
            Negotiated::Selected(mt) => Ok(mt),
            Negotiated::NotAcceptable(supported) => Err(Error::NotAcceptable { supported }),
        }
    }
}

/// Picks the representation to serve.
///
/// Each supported type is scored with [`AcceptList::quality_of`]; the highest
/// score wins and ties go to the earlier entry of `supported`. Types scored 0
/// are never selected.
pub fn negotiate(accept: &AcceptList, supported: &[MediaType]) -> Negotiated {
    let mut best: Option<(&MediaType, f32)> = None;
    for candidate in supported {
        let quality = accept.quality_of(candidate);
        if quality <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, q)| quality > q) {
            best = Some((candidate, quality));
        }
    }
    match best {
        Some((mt, _)) => Negotiated::Selected(mt.clone()),
        None => Negotiated::NotAcceptable(supported.to_vec()),
    }
}
