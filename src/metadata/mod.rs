//! Portable PDB container parsing and validation.
//!
//! A portable PDB is an ECMA-335 metadata container: a metadata root with a stream directory,
//! followed by the streams themselves. The resolver never needs the tables or heaps, only the
//! location of the `#Pdb` stream, whose first 20 bytes are the PDB id that is excluded from the
//! PDB's own checksum.
//!
//! # Key Components
//!
//! - [`root`] - Metadata root header and stream directory
//! - [`streamheader`] - Individual stream header entries
//! - [`checksum`] - Checksum entries, the `SymbolChecksum` header and PDB validation

pub mod checksum;
pub mod root;
pub mod streamheader;
