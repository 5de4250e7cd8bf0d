//! Content-addressed local cache.
//!
//! Files live at `<root>/<relative key>`, where the key is a [`SymbolIndex`] for PDBs or a
//! caller-chosen relative path for source files. Presence of a file is taken as proof that it was
//! validated before it was written, so nothing is ever stored without passing validation first
//! and lookups never re-validate.
//!
//! Writes run on the blocking pool: the bytes go to a [`tempfile::NamedTempFile`] next to the
//! entry, which is persisted into place once complete and removed otherwise. A store whose caller
//! goes away still runs to completion, so neither a truncated entry nor a stray temporary file is
//! left behind. There is no locking: concurrent stores of the same key are last-writer-wins, which
//! is harmless because the content for a key is fixed.

use std::{
    io::Write,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{symbols::index::SymbolIndex, Error, Result};

/// A directory of validated symbol and source files.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    /// Create a cache rooted at `root`. The directory is created lazily on the first store.
    pub fn new(root: impl Into<PathBuf>) -> LocalCache {
        LocalCache { root: root.into() }
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of a cached PDB, if present.
    pub async fn lookup(&self, index: &SymbolIndex) -> Option<PathBuf> {
        self.lookup_relative(index.as_str()).await
    }

    /// Stores a validated PDB and returns its path.
    ///
    /// # Errors
    /// Returns an error if the index is not a plain relative path or the file cannot be written.
    pub async fn store(&self, index: &SymbolIndex, bytes: &[u8]) -> Result<PathBuf> {
        self.store_relative(index.as_str(), bytes).await
    }

    /// Returns the path of any cached file keyed by a `/`-separated relative path, if present.
    ///
    /// Keys that do not map below the cache root are reported as a miss.
    pub async fn lookup_relative(&self, key: &str) -> Option<PathBuf> {
        let path = match self.path_for(key) {
            Ok(path) => path,
            Err(error) => {
                debug!(key, %error, "rejecting cache key");
                return None;
            }
        };

        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                trace!(path = %path.display(), "cache hit");
                Some(path)
            }
            Ok(false) => None,
            Err(error) => {
                debug!(path = %path.display(), %error, "cache lookup failed");
                None
            }
        }
    }

    /// Stores `bytes` under a `/`-separated relative key, creating parent directories.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] for keys that do not map below the cache root, or
    /// [`Error::FileError`] if a directory or the file cannot be written.
    pub async fn store_relative(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(key)?;
        let Some(parent) = path.parent().map(Path::to_path_buf) else {
            return Err(Error::InvalidPath(key.to_string()));
        };

        let target = path.clone();
        let owned = bytes.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&parent, &target, &owned))
            .await
            .map_err(|error| Error::Error(format!("cache write task failed - {error}")))??;

        debug!(path = %path.display(), len = bytes.len(), "stored in cache");
        Ok(path)
    }

    /// Maps a relative key onto a path below the root.
    ///
    /// Every segment must be a normal path component: no empty segments, no `.`/`..`, no roots or
    /// drive prefixes.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();

        for segment in key.split('/') {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) if name == segment => path.push(name),
                _ => return Err(Error::InvalidPath(key.to_string())),
            }
        }

        Ok(path)
    }
}

/// Writes `bytes` to a temporary file in `parent` and persists it as `path`.
///
/// The temporary file is deleted on every early return.
fn write_atomic(parent: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.persist(path).map_err(|error| error.error)?;

    Ok(())
}
