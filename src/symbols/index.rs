//! Symbol index derivation.
//!
//! The symbol index is the relative path under which symbol servers (and the local cache) store a
//! portable PDB:
//!
//! ```text
//! <file name>/<PDB id as 32 uppercase hex digits>FFFFFFFF/<file name>
//! ```
//!
//! The file name is the last component of the path recorded in the CodeView entry, lowercased.
//! Windows PDB indexes put the PE age after the id; portable PDBs have no age, so the key is
//! padded with `FFFFFFFF` instead. Each segment is percent-encoded on its own, so a reserved
//! character inside the name can never be mistaken for a path separator.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::file::debug::DebugDirectoryInfo;

/// Appended to the PDB id in place of the age field
pub const PORTABLE_PDB_AGE_SUFFIX: &str = "FFFFFFFF";

/// Everything except the RFC 3986 unreserved characters
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Canonical relative path of a portable PDB on a symbol server and in the cache.
///
/// Identical `(identifier, file name)` inputs always produce byte-identical indexes.
///
/// # Examples
///
/// ```rust
/// use dotsym::{DebugDirectoryInfo, SymbolIndex};
///
/// let info = DebugDirectoryInfo {
///     identifier: "12345678-1234-1234-1234-123456789abc".parse().unwrap(),
///     original_path: "C:\\build\\Foo.pdb".to_string(),
/// };
///
/// assert_eq!(
///     SymbolIndex::new(&info).unwrap().as_str(),
///     "foo.pdb/12345678123412341234123456789ABCFFFFFFFF/foo.pdb"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolIndex(String);

impl SymbolIndex {
    /// Derives the index for a CodeView entry.
    ///
    /// Returns `None` when the recorded path has no usable file name: it is empty, ends in a
    /// separator, or names `.` or `..`. Such an index would resolve outside the server base.
    #[must_use]
    pub fn new(info: &DebugDirectoryInfo) -> Option<SymbolIndex> {
        let file_name = file_name(&info.original_path).to_lowercase();
        if matches!(file_name.as_str(), "" | "." | "..") {
            return None;
        }

        let key = format!(
            "{}{}",
            info.identifier
                .to_string()
                .replace('-', "")
                .to_ascii_uppercase(),
            PORTABLE_PDB_AGE_SUFFIX
        );

        let index = [file_name.as_str(), key.as_str(), file_name.as_str()]
            .iter()
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");

        Some(SymbolIndex(index))
    }

    /// The index as a `/`-separated relative path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated segments of the index.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SymbolIndex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The last component of a path written with either `/` or `\` separators.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
