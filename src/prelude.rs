//! # dotsym Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the dotsym
//! library. Import this module to get quick access to everything needed to resolve a PDB.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotsym operations
pub use crate::Error;

/// Category of an [`Error`]
pub use crate::ErrorKind;

/// The result type used throughout dotsym
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The resolver pipeline and its configuration
pub use crate::{ResolverConfig, SymbolResolver};

/// Cancellation handle for resolver operations
pub use crate::CancellationToken;

// ================================================================================================
// Building Blocks
// ================================================================================================

/// PE image access and debug directory
pub use crate::{DebugDirectory, DebugDirectoryInfo, File};

/// Checksums and validation
pub use crate::{metadata::checksum::validate, ChecksumAlgorithm, ChecksumEntry};

/// Symbol index, cache, fetch and transport
pub use crate::{FetchRequest, FetchResponse, LocalCache, SymbolFetcher, SymbolIndex, Transport};

/// Source Link documents
pub use crate::SourceLink;
