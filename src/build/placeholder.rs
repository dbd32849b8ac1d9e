//! Placeholder image URIs.
//!
//! Documents are read before any render exists, so an image node cannot point
//! at the final file yet without the host complaining about a missing image.
//! The node gets a `data:` URI instead, rewritten once rendering is done.

use std::collections::BTreeMap;
use std::path::Path;

/// Prefix marking a deferred tape image.
pub const PLACEHOLDER_PREFIX: &str = "data:vhs-tape;";

/// Placeholder URI for the display file at `path`.
pub fn placeholder_uri(path: &Path) -> String {
    format!("{PLACEHOLDER_PREFIX}{}", path.display())
}

/// Final image reference derived from a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Path of the display file.
    pub uri: String,
    /// Candidate URIs by MIME type (`*` and `image/gif`).
    pub candidates: BTreeMap<String, String>,
}

/// Rewrite a placeholder URI. Other URIs yield `None`.
pub fn resolve_placeholder(uri: &str) -> Option<ResolvedImage> {
    let path = uri.strip_prefix(PLACEHOLDER_PREFIX)?;
    let candidates = ["*", "image/gif"]
        .into_iter()
        .map(|mime| (mime.to_owned(), path.to_owned()))
        .collect();
    Some(ResolvedImage {
        uri: path.to_owned(),
        candidates,
    })
}
