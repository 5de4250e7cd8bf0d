//! Source Link document mapping.
//!
//! A Source Link document maps build-time source paths to urls:
//!
//! ```json
//! {
//!     "documents": {
//!         "C:\\src\\repo\\*": "https://raw.example.com/org/repo/abc123/*",
//!         "C:\\src\\generated\\Version.cs": "https://example.com/Version.cs"
//!     }
//! }
//! ```
//!
//! Keys without `*` must match the whole path. A key ending in `*` matches any path starting with
//! the part before it, and the rest of the path (with `\` turned into `/`) replaces the `*` in the
//! url. Matching ignores ASCII case and the longest matching key wins.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Result;

/// A parsed Source Link document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceLink {
    /// Path pattern to url template
    pub documents: BTreeMap<String, String>,
}

impl SourceLink {
    /// Parses a Source Link JSON document.
    ///
    /// # Errors
    /// Returns [`crate::Error::SourceLink`] if the text is not a valid Source Link document.
    pub fn from_json(json: &str) -> Result<SourceLink> {
        Ok(serde_json::from_str(json)?)
    }

    /// Maps a build-time document path to its url, if any entry matches.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<String> {
        let mut best: Option<(usize, String)> = None;

        for (pattern, url) in &self.documents {
            let candidate = match pattern.strip_suffix('*') {
                Some(prefix) => {
                    let Some(head) = path.get(..prefix.len()) else {
                        continue;
                    };
                    if !head.eq_ignore_ascii_case(prefix) {
                        continue;
                    }
                    let rest = path[prefix.len()..].replace('\\', "/");
                    url.replacen('*', &rest, 1)
                }
                None if pattern.eq_ignore_ascii_case(path) => url.clone(),
                None => continue,
            };

            if best.as_ref().map_or(true, |(len, _)| pattern.len() > *len) {
                best = Some((pattern.len(), candidate));
            }
        }

        best.map(|(_, url)| url)
    }
}
