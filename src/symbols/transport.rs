//! HTTP transport seam.
//!
//! The fetch coordinator only ever issues plain `GET`s with an optional checksum header and only
//! cares about the status and, for `200 OK`, the body. [`Transport`] captures exactly that, so
//! the race logic can be driven by a scripted transport in tests while production uses a shared
//! [`reqwest::Client`].
//!
//! The client is long-lived: build one per process (or per [`crate::SymbolResolver`]) and share
//! it behind an `Arc`. `reqwest::Client` pools connections internally and is safe to use from many
//! tasks at once.

use std::future::Future;

use reqwest::{header::HeaderValue, StatusCode};
use url::Url;

use crate::{metadata::checksum::CHECKSUM_HEADER, Error, Result};

/// A single outgoing `GET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute url of the file
    pub url: Url,
    /// Value of the `SymbolChecksum` header, if any
    pub checksum: Option<String>,
}

/// What came back from a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status
    pub status: StatusCode,
    /// The body, only read for `200 OK`; empty otherwise
    pub body: Vec<u8>,
}

/// Issues requests against symbol and source servers.
///
/// Implementations must be shareable across tasks: the coordinator clones an `Arc` of the
/// transport into every spawned request.
pub trait Transport: Send + Sync + 'static {
    /// Performs the request.
    ///
    /// Connection failures, TLS errors and body read errors are returned as `Err`. Any HTTP status
    /// is a successful transport outcome.
    fn get(&self, request: FetchRequest) -> impl Future<Output = Result<FetchResponse>> + Send;
}

impl Transport for reqwest::Client {
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse> {
        let mut builder = reqwest::Client::get(self, request.url);
        if let Some(checksum) = request.checksum {
            let value = HeaderValue::from_str(&checksum)
                .map_err(|error| Error::Error(format!("Invalid checksum header - {error}")))?;
            builder = builder.header(CHECKSUM_HEADER, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Ok(FetchResponse {
                status,
                body: Vec::new(),
            });
        }

        let body = response.bytes().await?.to_vec();
        Ok(FetchResponse { status, body })
    }
}
