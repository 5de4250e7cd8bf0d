//! The resolution pipeline.
//!
//! [`SymbolResolver`] ties the pieces together:
//!
//! ```text
//! DebugDirectory -> SymbolIndex -> LocalCache hit?  -> path
//!                                      | miss
//!                                      v
//!                               allow_remote?  (no -> not found)
//!                                      v
//!                               SymbolFetcher race -> validated body -> LocalCache store -> path
//! ```
//!
//! Every public `resolve_*` method returns `Option`: all failures collapse into "not found" after
//! being logged. The `try_resolve_*` twins return the underlying [`Error`] for hosts that want to
//! tell an absent PDB from a broken network, see [`Error::kind`].
//!
//! All operations observe a [`CancellationToken`]. Cancelling drops the in-flight work, which
//! aborts outstanding requests; since cache writes are rename-into-place no partial file is left
//! behind.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotsym::{CancellationToken, DebugDirectory, ResolverConfig, SymbolResolver};
//! use std::path::Path;
//!
//! # async fn run() -> dotsym::Result<()> {
//! let resolver = SymbolResolver::new(ResolverConfig::from_env()?)?;
//! let debug = DebugDirectory::from_path(Path::new("MyApp.dll"))?;
//!
//! let cancel = CancellationToken::new();
//! if let Some(pdb) = resolver.resolve_symbol_file(&debug, true, &cancel).await {
//!     println!("{}", pdb.display());
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    file::debug::DebugDirectory,
    symbols::{
        cache::LocalCache,
        config::ResolverConfig,
        fetch::SymbolFetcher,
        index::SymbolIndex,
        sourcelink::SourceLink,
        transport::{FetchRequest, Transport},
    },
    Error, ErrorKind, Result,
};

/// Cache prefix for source files fetched through Source Link
pub const SOURCE_CACHE_PREFIX: &str = "src";

/// Locates portable PDBs and source files, locally first and then remotely.
///
/// Cheap to share: wrap it in an `Arc` and call it from as many tasks as needed.
#[derive(Debug)]
pub struct SymbolResolver<T = reqwest::Client> {
    transport: Arc<T>,
    cache: LocalCache,
    fetcher: SymbolFetcher<T>,
    timeout: Duration,
}

impl SymbolResolver<reqwest::Client> {
    /// Create a resolver backed by a new shared HTTP client.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self::with_transport(config, Arc::new(client)))
    }
}

impl<T: Transport> SymbolResolver<T> {
    /// Create a resolver over an existing transport.
    pub fn with_transport(config: ResolverConfig, transport: Arc<T>) -> Self {
        let fetcher = SymbolFetcher::new(Arc::clone(&transport), config.servers, config.timeout);

        SymbolResolver {
            transport,
            cache: LocalCache::new(config.cache_root),
            fetcher,
            timeout: config.timeout,
        }
    }

    /// The local cache.
    #[must_use]
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Resolves the portable PDB described by `debug` to a local file.
    ///
    /// Returns `None` when the image has no portable CodeView record, the PDB is neither cached
    /// nor (with `allow_remote`) available from any server with a matching checksum, or anything
    /// went wrong along the way.
    pub async fn resolve_symbol_file(
        &self,
        debug: &DebugDirectory,
        allow_remote: bool,
        cancel: &CancellationToken,
    ) -> Option<PathBuf> {
        settle(
            "symbol file",
            self.try_resolve_symbol_file(debug, allow_remote, cancel)
                .await,
        )
    }

    /// Like [`SymbolResolver::resolve_symbol_file`], but reports why nothing was resolved.
    ///
    /// # Errors
    /// - [`Error::NotFound`] when there is no CodeView record, its path has no file name, or no
    ///   server delivered a valid PDB
    /// - [`Error::RemoteDisabled`] on a cache miss with `allow_remote == false`
    /// - [`Error::Cancelled`] if `cancel` fired first
    /// - [`Error::FileError`] / [`Error::InvalidPath`] if the download could not be stored
    pub async fn try_resolve_symbol_file(
        &self,
        debug: &DebugDirectory,
        allow_remote: bool,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let Some(info) = &debug.info else {
            return Err(Error::NotFound(
                "image has no portable CodeView record".to_string(),
            ));
        };

        let Some(index) = SymbolIndex::new(info) else {
            return Err(Error::NotFound(format!(
                "CodeView path has no file name: {}",
                info.original_path
            )));
        };
        cancellable(cancel, self.fetch_symbol_file(&index, debug, allow_remote)).await
    }

    async fn fetch_symbol_file(
        &self,
        index: &SymbolIndex,
        debug: &DebugDirectory,
        allow_remote: bool,
    ) -> Result<PathBuf> {
        if let Some(path) = self.cache.lookup(index).await {
            debug!(%index, path = %path.display(), "symbol file found in cache");
            return Ok(path);
        }

        if !allow_remote {
            return Err(Error::RemoteDisabled(index.to_string()));
        }

        let fetched = self.fetcher.fetch(index, &debug.checksums).await?;
        self.cache.store(index, &fetched.body).await
    }

    /// Reads the debug directory of the PE image at `path` and resolves its portable PDB.
    pub async fn resolve_image(
        &self,
        path: &Path,
        allow_remote: bool,
        cancel: &CancellationToken,
    ) -> Option<PathBuf> {
        let debug = match DebugDirectory::from_path(path) {
            Ok(debug) => debug,
            Err(error) => {
                warn!(path = %path.display(), %error, "cannot read debug directory");
                return None;
            }
        };

        self.resolve_symbol_file(&debug, allow_remote, cancel).await
    }

    /// Resolves a source file by url, caching it under `relative_cache_path`.
    ///
    /// A cached copy is returned without contacting the server.
    pub async fn resolve_source_file(
        &self,
        url: &Url,
        relative_cache_path: &str,
        cancel: &CancellationToken,
    ) -> Option<PathBuf> {
        settle(
            "source file",
            self.try_resolve_source_file(url, relative_cache_path, cancel)
                .await,
        )
    }

    /// Like [`SymbolResolver::resolve_source_file`], but reports why nothing was resolved.
    ///
    /// # Errors
    /// - [`Error::NotFound`] for any status other than `200 OK`
    /// - [`Error::Transport`] / [`Error::Timeout`] if the request failed
    /// - [`Error::InvalidPath`] if `relative_cache_path` does not map below the cache root
    /// - [`Error::Cancelled`] if `cancel` fired first
    pub async fn try_resolve_source_file(
        &self,
        url: &Url,
        relative_cache_path: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        cancellable(cancel, self.fetch_source_file(url, relative_cache_path)).await
    }

    async fn fetch_source_file(&self, url: &Url, relative_cache_path: &str) -> Result<PathBuf> {
        if let Some(path) = self.cache.lookup_relative(relative_cache_path).await {
            debug!(%url, path = %path.display(), "source file found in cache");
            return Ok(path);
        }

        let request = FetchRequest {
            url: url.clone(),
            checksum: None,
        };
        let response = tokio::time::timeout(self.timeout, self.transport.get(request))
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        if response.status != StatusCode::OK {
            return Err(Error::NotFound(format!("{url} - {}", response.status)));
        }

        let path = self
            .cache
            .store_relative(relative_cache_path, &response.body)
            .await?;
        info!(%url, path = %path.display(), "downloaded source file");
        Ok(path)
    }

    /// Maps a build-time document path through `source_link` and resolves the resulting url.
    ///
    /// The file is cached under `src/<host>/<url path>`.
    pub async fn resolve_source_link(
        &self,
        source_link: &SourceLink,
        document_path: &str,
        cancel: &CancellationToken,
    ) -> Option<PathBuf> {
        let Some(url) = source_link.resolve(document_path) else {
            debug!(document_path, "document not covered by source link");
            return None;
        };

        let (url, key) = match source_cache_key(&url) {
            Ok(resolved) => resolved,
            Err(error) => {
                warn!(%url, %error, "cannot map source link url");
                return None;
            }
        };

        self.resolve_source_file(&url, &key, cancel).await
    }
}

/// Parses a source url and derives its cache key, `src/<host>/<path>`.
///
/// # Errors
/// Returns [`Error::InvalidUrl`] if `url` does not parse, or [`Error::InvalidPath`] if it has no
/// host or no path.
pub fn source_cache_key(url: &str) -> Result<(Url, String)> {
    let parsed = Url::parse(url)?;
    let Some(host) = parsed.host_str() else {
        return Err(Error::InvalidPath(url.to_string()));
    };

    let path = parsed.path().trim_start_matches('/');
    if path.is_empty() {
        return Err(Error::InvalidPath(url.to_string()));
    }

    let key = format!("{SOURCE_CACHE_PREFIX}/{host}/{path}");
    Ok((parsed, key))
}

async fn cancellable<F, R>(cancel: &CancellationToken, work: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = work => result,
    }
}

fn settle(what: &str, result: Result<PathBuf>) -> Option<PathBuf> {
    match result {
        Ok(path) => Some(path),
        Err(error) => {
            match error.kind() {
                ErrorKind::Absence | ErrorKind::Cancelled => {
                    debug!(%error, "{what} not resolved");
                }
                ErrorKind::Infrastructure | ErrorKind::Malformed => {
                    warn!(%error, "{what} not resolved");
                }
            }
            None
        }
    }
}
