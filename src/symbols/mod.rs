//! Symbol resolution: from a debug directory to a validated portable PDB on disk.
//!
//! # Architecture
//!
//! - [`index`] - derives the canonical server/cache path of a PDB
//! - [`cache`] - the local directory of validated files
//! - [`transport`] - the HTTP seam, implemented for [`reqwest::Client`]
//! - [`fetch`] - races every symbol server and keeps the first valid body
//! - [`sourcelink`] - maps build-time document paths to source urls
//! - [`config`] - cache root, servers and timeouts
//! - [`resolver`] - the public pipeline tying it all together
//!
//! Most hosts only need [`resolver::SymbolResolver`] and [`config::ResolverConfig`].

pub mod cache;
pub mod config;
pub mod fetch;
pub mod index;
pub mod resolver;
pub mod sourcelink;
pub mod transport;
