//! Symbol fetch coordinator.
//!
//! For one [`SymbolIndex`] the coordinator asks every configured symbol server at once and takes
//! the first answer that is usable:
//!
//! 1. one task per server is spawned into a [`JoinSet`], each wrapped in the per-request timeout;
//! 2. results are consumed in completion order, not in server order;
//! 3. failures, timeouts and any status other than `200 OK` are skipped;
//! 4. a `200 OK` body is checked against the expected checksums (when there are any) and
//!    skipped on mismatch or if it is not a valid portable PDB;
//! 5. the first body that passes wins, every request still in flight is aborted.
//!
//! If no completion is usable the result is [`Error::NotFound`]. There are no retries.

use std::{sync::Arc, time::Duration};

use reqwest::StatusCode;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    metadata::checksum::{checksum_header, validate, ChecksumEntry},
    symbols::{
        index::SymbolIndex,
        transport::{FetchRequest, Transport},
    },
    Error, Result,
};

/// A body that was accepted, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSymbol {
    /// The url that served the body
    pub url: Url,
    /// The portable PDB
    pub body: Vec<u8>,
}

/// Races symbol servers for a PDB.
#[derive(Debug)]
pub struct SymbolFetcher<T> {
    transport: Arc<T>,
    servers: Vec<Url>,
    timeout: Duration,
}

impl<T: Transport> SymbolFetcher<T> {
    /// Create a fetcher over `servers`, sharing `transport`.
    ///
    /// Server bases are used as directories: a missing trailing `/` is added so the index is
    /// appended rather than replacing the last path segment.
    pub fn new(transport: Arc<T>, servers: Vec<Url>, timeout: Duration) -> SymbolFetcher<T> {
        let servers = servers.into_iter().map(as_directory).collect();

        SymbolFetcher {
            transport,
            servers,
            timeout,
        }
    }

    /// The configured server bases, normalized to end in `/`.
    #[must_use]
    pub fn servers(&self) -> &[Url] {
        &self.servers
    }

    /// Builds one absolute url per server for `index`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidUrl`] if the index cannot be joined onto a base.
    pub fn urls(&self, index: &SymbolIndex) -> Result<Vec<Url>> {
        self.servers
            .iter()
            .map(|server| server.join(index.as_str()).map_err(Error::from))
            .collect()
    }

    /// Fetches the PDB for `index` from whichever server delivers a valid copy first.
    ///
    /// With no `checksums` the first `200 OK` body is accepted as is.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when every server failed, answered with another status or
    /// delivered a body that did not validate.
    pub async fn fetch(
        &self,
        index: &SymbolIndex,
        checksums: &[ChecksumEntry],
    ) -> Result<FetchedSymbol> {
        let header = checksum_header(checksums);
        let mut pending = JoinSet::new();

        for url in self.urls(index)? {
            let transport = Arc::clone(&self.transport);
            let request = FetchRequest {
                url: url.clone(),
                checksum: header.clone(),
            };
            let budget = self.timeout;

            pending.spawn(async move {
                let outcome = match tokio::time::timeout(budget, transport.get(request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Timeout(budget)),
                };
                (url, outcome)
            });
        }

        while let Some(joined) = pending.join_next().await {
            let (url, outcome) = match joined {
                Ok(completed) => completed,
                Err(error) => {
                    warn!(%error, "symbol request task failed");
                    continue;
                }
            };

            let response = match outcome {
                Ok(response) => response,
                Err(error) => {
                    warn!(%url, %error, "symbol server request failed");
                    continue;
                }
            };

            if response.status != StatusCode::OK {
                debug!(%url, status = %response.status, "symbol server does not have the file");
                continue;
            }

            let mut body = response.body;
            if !checksums.is_empty() {
                match validate(&mut body, checksums) {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(%url, "downloaded symbol file does not match any checksum");
                        continue;
                    }
                    Err(error) => {
                        warn!(%url, %error, "downloaded symbol file is not a valid portable PDB");
                        continue;
                    }
                }
            }

            pending.abort_all();
            info!(%url, len = body.len(), "downloaded symbol file");
            return Ok(FetchedSymbol { url, body });
        }

        Err(Error::NotFound(index.to_string()))
    }
}

fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
