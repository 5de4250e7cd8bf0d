//! Resolver configuration.
//!
//! Defaults point at the two public .NET symbol servers and a cache below the system temp
//! directory. Hosts usually override the cache root with a platform-appropriate location.
//!
//! ## Environment Variables
//!
//! [`ResolverConfig::from_env`] starts from the defaults and applies:
//!
//! - `DOTSYM_CACHE_DIR`: cache root directory
//! - `DOTSYM_SYMBOL_SERVERS`: `;`-separated list of server base urls
//! - `DOTSYM_TIMEOUT_SECS`: per-request timeout in seconds

use std::{env, path::PathBuf, time::Duration};

use url::Url;

use crate::{Error, Result};

/// Public symbol servers queried by default
pub const DEFAULT_SYMBOL_SERVERS: [&str; 2] = [
    "https://msdl.microsoft.com/download/symbols/",
    "https://symbols.nuget.org/download/symbols/",
];

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the cache root
pub const ENV_CACHE_DIR: &str = "DOTSYM_CACHE_DIR";
/// Environment variable overriding the symbol servers
pub const ENV_SYMBOL_SERVERS: &str = "DOTSYM_SYMBOL_SERVERS";
/// Environment variable overriding the timeout, in seconds
pub const ENV_TIMEOUT_SECS: &str = "DOTSYM_TIMEOUT_SECS";

/// Settings for a [`crate::SymbolResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Directory holding cached PDBs and source files
    pub cache_root: PathBuf,
    /// Symbol server bases, queried concurrently
    pub servers: Vec<Url>,
    /// Budget for a single request
    pub timeout: Duration,
    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            cache_root: env::temp_dir().join("dotsym"),
            servers: DEFAULT_SYMBOL_SERVERS
                .iter()
                .filter_map(|server| Url::parse(server).ok())
                .collect(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("dotsym/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ResolverConfig {
    /// The defaults, overridden by `DOTSYM_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a server url or the timeout cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = ResolverConfig::default();

        if let Some(dir) = env::var_os(ENV_CACHE_DIR) {
            config.cache_root = PathBuf::from(dir);
        }

        if let Ok(servers) = env::var(ENV_SYMBOL_SERVERS) {
            config.servers = parse_servers(&servers)?;
        }

        if let Ok(secs) = env::var(ENV_TIMEOUT_SECS) {
            let secs = secs.trim().parse::<u64>().map_err(|error| {
                Error::Error(format!("Invalid {ENV_TIMEOUT_SECS} '{secs}' - {error}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Sets the cache root.
    #[must_use]
    pub fn with_cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
        self.cache_root = cache_root.into();
        self
    }

    /// Replaces the symbol servers.
    #[must_use]
    pub fn with_servers(mut self, servers: Vec<Url>) -> Self {
        self.servers = servers;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the `User-Agent`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Parses a `;`-separated list of urls, ignoring empty items.
///
/// # Errors
/// Returns [`Error::InvalidUrl`] for the first item that is not a url.
pub fn parse_servers(list: &str) -> Result<Vec<Url>> {
    list.split(';')
        .map(str::trim)
        .filter(|server| !server.is_empty())
        .map(|server| Url::parse(server).map_err(Error::from))
        .collect()
}
