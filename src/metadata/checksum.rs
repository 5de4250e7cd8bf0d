//! PDB checksum entries and their validation against a downloaded portable PDB.
//!
//! A `PdbChecksum` debug directory record asserts the hash of the PDB the executable was built
//! with. The hash covers the whole PDB file with one exception: the 20-byte PDB id at the start of
//! the `#Pdb` stream is zeroed first, because the id itself is derived from the content hash and is
//! unknown while the hash is computed.
//!
//! Validating a candidate therefore means: locate `#Pdb` through the metadata root, zero those 20
//! bytes, hash, compare, and put the original bytes back. The zeroing happens in place under a
//! guard that restores the id when dropped, so the caller's buffer is unchanged on every exit
//! path, including parse errors and panics inside a hasher.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotsym::{metadata::checksum::validate, ChecksumEntry};
//!
//! let mut pdb = std::fs::read("Foo.pdb")?;
//! let expected = ChecksumEntry::new("SHA256", vec![0u8; 32]);
//! if validate(&mut pdb, &[expected])? {
//!     println!("Foo.pdb matches");
//! }
//! # Ok::<(), dotsym::Error>(())
//! ```

use std::{fmt, str::FromStr};

use sha2::{Digest, Sha256, Sha384, Sha512};
use strum::{Display, EnumIter, EnumString};

use crate::{
    file::io::read_cstr_at,
    metadata::root::pdb_stream_offset,
    Error::OutOfBounds,
    Result,
};

/// Size of the PDB id at the start of the `#Pdb` stream: a 16-byte GUID and a 4-byte stamp
pub const PDB_ID_SIZE: usize = 20;

/// Name of the request header that carries expected checksums to a symbol server
pub const CHECKSUM_HEADER: &str = "SymbolChecksum";

/// Hash algorithms a `PdbChecksum` record may name.
///
/// Names are matched ASCII case-insensitively; anything else is skipped during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum ChecksumAlgorithm {
    /// SHA-256
    #[strum(serialize = "SHA256")]
    Sha256,
    /// SHA-384
    #[strum(serialize = "SHA384")]
    Sha384,
    /// SHA-512
    #[strum(serialize = "SHA512")]
    Sha512,
}

impl ChecksumAlgorithm {
    /// Computes the digest of `data`.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            ChecksumAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            ChecksumAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            ChecksumAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// An expected digest of a PDB, as recorded in the executable's debug directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Algorithm name as written by the compiler, e.g. `SHA256`
    pub algorithm_name: String,
    /// The expected digest
    pub digest: Vec<u8>,
}

impl ChecksumEntry {
    /// Create a new checksum entry
    pub fn new(algorithm_name: impl Into<String>, digest: Vec<u8>) -> ChecksumEntry {
        ChecksumEntry {
            algorithm_name: algorithm_name.into(),
            digest,
        }
    }

    /// Reads the raw data of a `PdbChecksum` debug directory record: a NUL-terminated UTF-8
    /// algorithm name followed by the digest.
    ///
    /// # Errors
    /// Returns an error if the name is unterminated, not UTF-8, or the digest is empty.
    pub fn read(data: &[u8]) -> Result<ChecksumEntry> {
        let mut offset = 0;
        let algorithm_name = read_cstr_at(data, &mut offset)?;

        if algorithm_name.is_empty() {
            return Err(malformed_error!("PdbChecksum record has an empty algorithm name"));
        }

        let digest = &data[offset..];
        if digest.is_empty() {
            return Err(OutOfBounds);
        }

        Ok(ChecksumEntry::new(algorithm_name, digest.to_vec()))
    }

    /// The algorithm, if it is one we can compute.
    #[must_use]
    pub fn algorithm(&self) -> Option<ChecksumAlgorithm> {
        ChecksumAlgorithm::from_str(&self.algorithm_name).ok()
    }
}

impl fmt::Display for ChecksumEntry {
    /// Formats as `algorithm:lowercasehex`, the form used in the `SymbolChecksum` header.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm_name, hex::encode(&self.digest))
    }
}

/// Builds the `SymbolChecksum` header value, `alg1:hex1;alg2:hex2`, or `None` without entries.
#[must_use]
pub fn checksum_header(checksums: &[ChecksumEntry]) -> Option<String> {
    if checksums.is_empty() {
        return None;
    }

    Some(
        checksums
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";"),
    )
}

/// Zeroes the PDB id in place and restores it when dropped.
struct Redaction<'a> {
    data: &'a mut [u8],
    offset: usize,
    saved: [u8; PDB_ID_SIZE],
}

impl<'a> Redaction<'a> {
    fn new(data: &'a mut [u8], offset: usize) -> Result<Redaction<'a>> {
        let end = offset.checked_add(PDB_ID_SIZE).ok_or(OutOfBounds)?;
        let Some(id) = data.get_mut(offset..end) else {
            return Err(OutOfBounds);
        };

        let mut saved = [0_u8; PDB_ID_SIZE];
        saved.copy_from_slice(id);
        id.fill(0);

        Ok(Redaction {
            data,
            offset,
            saved,
        })
    }

    fn bytes(&self) -> &[u8] {
        self.data
    }
}

impl Drop for Redaction<'_> {
    fn drop(&mut self) {
        self.data[self.offset..self.offset + PDB_ID_SIZE].copy_from_slice(&self.saved);
    }
}

/// Checks a portable PDB against a set of expected checksums.
///
/// Returns `true` as soon as one entry with a supported algorithm matches the digest of `data`
/// with its PDB id zeroed, `false` if none does. Entries with unknown algorithms are skipped.
/// `data` is identical to its input when this returns, whatever the outcome.
///
/// # Errors
/// Returns an error if `data` is not a metadata container with a `#Pdb` stream holding at least a
/// full PDB id. Callers treat this exactly like a mismatch.
pub fn validate(data: &mut [u8], checksums: &[ChecksumEntry]) -> Result<bool> {
    let offset = pdb_stream_offset(data)? as usize;
    let redacted = Redaction::new(data, offset)?;

    let matched = checksums.iter().any(|checksum| match checksum.algorithm() {
        Some(algorithm) => algorithm.digest(redacted.bytes()) == checksum.digest,
        None => {
            tracing::debug!(
                algorithm = %checksum.algorithm_name,
                "skipping checksum with unsupported algorithm"
            );
            false
        }
    });

    Ok(matched)
}
