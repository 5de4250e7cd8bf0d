// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotsym
//!
//! Locates the portable PDB of a .NET executable: reads the image's debug directory, derives the
//! symbol index, serves the PDB from a local cache or races the configured symbol servers for it,
//! and only ever keeps a download whose checksum matches the one recorded in the executable.
//!
//! ## Features
//!
//! - **Debug directory parsing** - CodeView (`RSDS`) and `PdbChecksum` records from any PE image
//! - **Checksum validation** - SHA-256/384/512 over the PDB with its id zeroed, without copying
//! - **Concurrent fetch** - every server at once, first valid answer wins, the rest are abandoned
//! - **Local cache** - content-addressed, crash-safe writes, no re-validation on hit
//! - **Source Link** - maps build-time document paths to source urls and caches the files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotsym::prelude::*;
//! use std::path::Path;
//!
//! # async fn run() -> dotsym::Result<()> {
//! let resolver = SymbolResolver::new(ResolverConfig::default())?;
//! let cancel = CancellationToken::new();
//!
//! match resolver.resolve_image(Path::new("MyApp.dll"), true, &cancel).await {
//!     Some(pdb) => println!("PDB at {}", pdb.display()),
//!     None => println!("no PDB found"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Lower-level building blocks
//!
//! ```rust,no_run
//! use dotsym::{DebugDirectory, SymbolIndex};
//! use std::path::Path;
//!
//! let debug = DebugDirectory::from_path(Path::new("MyApp.dll"))?;
//! if let Some(index) = debug.info.as_ref().and_then(SymbolIndex::new) {
//!     println!("index: {index}");
//! }
//! for checksum in &debug.checksums {
//!     println!("expects {}", checksum);
//! }
//! # Ok::<(), dotsym::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Parsing and the `try_resolve_*` methods return [`Result`] with the crate's [`Error`] type.
//! [`Error::kind`] tells a normal absence apart from infrastructure failures and malformed input.
//! The `resolve_*` methods log the failure with `tracing` and return `None`.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use dotsym::prelude::*;
///
/// let debug = DebugDirectory::from_path(std::path::Path::new("MyApp.dll"))?;
/// println!("{} checksums", debug.checksums.len());
/// # Ok::<(), dotsym::Error>(())
/// ```
pub mod prelude;

/// PE image access and the debug directory reader.
///
/// # Key Types
///
/// - [`File`] - a memory-mapped or in-memory PE image
/// - [`DebugDirectory`] - the CodeView and PDB checksum records of an image
pub mod file;

/// Metadata root parsing and PDB checksum validation.
///
/// # Key Components
///
/// - [`metadata::root`] - metadata root and stream directory, `#Pdb` lookup
/// - [`metadata::streamheader`] - individual stream headers
/// - [`metadata::checksum`] - checksum entries and validation
pub mod metadata;

/// Symbol index, local cache, symbol server fetch and the resolver pipeline.
pub mod symbols;

/// `dotsym` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotsym` Error type and its category
pub use error::{Error, ErrorKind};

/// PE image and its debug directory.
pub use file::{
    debug::{DebugDirectory, DebugDirectoryInfo},
    File,
};

/// Metadata structures and checksum entries.
pub use metadata::{
    checksum::{ChecksumAlgorithm, ChecksumEntry},
    root::Root,
    streamheader::StreamHeader,
};

/// Symbol resolution.
pub use symbols::{
    cache::LocalCache,
    config::ResolverConfig,
    fetch::{FetchedSymbol, SymbolFetcher},
    index::SymbolIndex,
    resolver::SymbolResolver,
    sourcelink::SourceLink,
    transport::{FetchRequest, FetchResponse, Transport},
};

/// Cancellation handle accepted by every resolver operation.
pub use tokio_util::sync::CancellationToken;
