//! Entity tag generation.

use crate::graph::UNKNOWN_MODIFICATION;
use crate::media_type::MediaType;

/// Computes a strong validator for one representation of a graph.
///
/// Returns `None` if the last modification is unknown or there is no media
/// type. Otherwise returns the hex blake3 digest of
/// `"{uri}-{last_modification}-{media_type}"`.
pub fn generate_etag(uri: &str, last_modification: i64, media_type: Option<&MediaType>) -> Option<String> {
    if last_modification == UNKNOWN_MODIFICATION {
        return None;
    }
    let media_type = media_type?;
    let input = format!("{}-{}-{}", uri, last_modification, media_type);
    Some(blake3::hash(input.as_bytes()).to_hex().to_string())
}
