//! PE debug directory reader.
//!
//! The debug directory is an array of 28-byte `IMAGE_DEBUG_DIRECTORY` records. Two record types
//! matter for locating a portable PDB:
//!
//! - **CodeView** (type 2) carrying the `RSDS` record: the PDB's GUID and the path it was written
//!   to at build time. Portable PDBs mark their CodeView record with minor version `0x504D`
//!   ("PM"); Windows PDBs use minor version 0 and are ignored here.
//! - **PdbChecksum** (type 19): an algorithm name and a digest of the PDB, computed with the PDB's
//!   own id zeroed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotsym::{DebugDirectory, SymbolIndex};
//! use std::path::Path;
//!
//! let debug = DebugDirectory::from_path(Path::new("MyApp.dll"))?;
//! if let Some(index) = debug.info.as_ref().and_then(SymbolIndex::new) {
//!     println!("{index}");
//! }
//! # Ok::<(), dotsym::Error>(())
//! ```
//!
//! # References
//!
//! - Microsoft PE/COFF Specification, "The .debug Section"
//! - Portable PDB v1.0, "PE/COFF Debug Directory Entries"

use std::path::Path;

use uguid::Guid;

use crate::{
    file::{
        io::{read_bytes_at, read_cstr_at, read_le_at},
        File,
    },
    metadata::checksum::ChecksumEntry,
    Result,
};

/// Size of a single `IMAGE_DEBUG_DIRECTORY` record
pub const DEBUG_DIRECTORY_ENTRY_SIZE: usize = 28;

/// `IMAGE_DEBUG_TYPE_CODEVIEW`
pub const IMAGE_DEBUG_TYPE_CODEVIEW: u32 = 2;

/// `IMAGE_DEBUG_TYPE_PDBCHECKSUM`
pub const IMAGE_DEBUG_TYPE_PDBCHECKSUM: u32 = 19;

/// Minor version of a CodeView record that points at a portable PDB ("PM")
pub const PORTABLE_CODEVIEW_MINOR_VERSION: u16 = 0x504D;

/// The MAGIC value of a CodeView PDB 7.0 record ("RSDS")
pub const CODEVIEW_RSDS_MAGIC: u32 = 0x5344_5352;

/// A single `IMAGE_DEBUG_DIRECTORY` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugDirectoryEntry {
    /// Reserved, always 0
    pub characteristics: u32,
    /// Time stamp of the debug data, or a hash for deterministic builds
    pub time_date_stamp: u32,
    /// `MajorVersion`
    pub major_version: u16,
    /// `MinorVersion`
    pub minor_version: u16,
    /// `IMAGE_DEBUG_TYPE_*`
    pub debug_type: u32,
    /// Size of the raw data, in bytes
    pub size_of_data: u32,
    /// RVA of the raw data when the image is loaded, 0 if not mapped
    pub address_of_raw_data: u32,
    /// File offset of the raw data
    pub pointer_to_raw_data: u32,
}

impl DebugDirectoryEntry {
    /// Reads a [`DebugDirectoryEntry`] from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 28 bytes are available.
    pub fn read(data: &[u8]) -> Result<DebugDirectoryEntry> {
        let mut offset = 0;

        Ok(DebugDirectoryEntry {
            characteristics: read_le_at::<u32>(data, &mut offset)?,
            time_date_stamp: read_le_at::<u32>(data, &mut offset)?,
            major_version: read_le_at::<u16>(data, &mut offset)?,
            minor_version: read_le_at::<u16>(data, &mut offset)?,
            debug_type: read_le_at::<u32>(data, &mut offset)?,
            size_of_data: read_le_at::<u32>(data, &mut offset)?,
            address_of_raw_data: read_le_at::<u32>(data, &mut offset)?,
            pointer_to_raw_data: read_le_at::<u32>(data, &mut offset)?,
        })
    }

    /// `true` for a CodeView record that refers to a portable PDB.
    #[must_use]
    pub fn is_portable_codeview(&self) -> bool {
        self.debug_type == IMAGE_DEBUG_TYPE_CODEVIEW
            && self.minor_version == PORTABLE_CODEVIEW_MINOR_VERSION
    }

    /// `true` for a PDB checksum record.
    #[must_use]
    pub fn is_pdb_checksum(&self) -> bool {
        self.debug_type == IMAGE_DEBUG_TYPE_PDBCHECKSUM
    }
}

/// Identity of the portable PDB an executable was built with, taken from its CodeView record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugDirectoryInfo {
    /// The PDB id GUID
    pub identifier: Guid,
    /// Path of the PDB at build time, with whatever separators the build machine used
    pub original_path: String,
}

impl DebugDirectoryInfo {
    /// Reads an `RSDS` CodeView record.
    ///
    /// The age field is read past but not kept, portable PDBs do not use it.
    ///
    /// # Errors
    /// Returns an error if the signature is not `RSDS`, the record is truncated or the path is not
    /// NUL-terminated UTF-8.
    pub fn read_codeview(data: &[u8]) -> Result<DebugDirectoryInfo> {
        let mut offset = 0;

        let signature = read_le_at::<u32>(data, &mut offset)?;
        if signature != CODEVIEW_RSDS_MAGIC {
            return Err(malformed_error!(
                "CodeView signature does not match - 0x{:08X}",
                signature
            ));
        }

        let mut guid = [0_u8; 16];
        guid.copy_from_slice(read_bytes_at(data, &mut offset, 16)?);
        let _age = read_le_at::<u32>(data, &mut offset)?;
        let original_path = read_cstr_at(data, &mut offset)?.to_string();

        Ok(DebugDirectoryInfo {
            identifier: Guid::from_bytes(guid),
            original_path,
        })
    }
}

/// Everything the resolver needs from an executable's debug directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugDirectory {
    /// The portable CodeView record, `None` when the image has none
    pub info: Option<DebugDirectoryInfo>,
    /// PDB checksum records, in directory order
    pub checksums: Vec<ChecksumEntry>,
}

impl DebugDirectory {
    /// Reads the debug directory of the PE image at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be loaded as a PE image or its debug directory is
    /// malformed.
    pub fn from_path(path: &Path) -> Result<DebugDirectory> {
        let file = File::from_file(path)?;
        Self::read(&file)
    }

    /// Reads the debug directory of a loaded image.
    ///
    /// An image without a debug data directory yields an empty [`DebugDirectory`].
    ///
    /// # Errors
    /// Returns an error if the directory or one of its relevant records is malformed.
    pub fn read(file: &File) -> Result<DebugDirectory> {
        let Some((rva, size)) = file.debug_directory() else {
            return Ok(DebugDirectory::default());
        };

        let table_offset = file.rva_to_offset(rva as usize)?;
        Self::from_table(file.data(), table_offset, size as usize, |rva| {
            file.rva_to_offset(rva as usize)
        })
    }

    /// Reads the debug directory from raw image bytes, given the file offset and size of the
    /// directory table.
    ///
    /// `resolve_rva` is only consulted for records whose `pointer_to_raw_data` is zero.
    ///
    /// If several portable CodeView records are present, the last one wins.
    ///
    /// # Errors
    /// Returns an error if the table or a CodeView/checksum record is out of bounds or malformed.
    pub fn from_table<F>(
        data: &[u8],
        table_offset: usize,
        table_size: usize,
        resolve_rva: F,
    ) -> Result<DebugDirectory>
    where
        F: Fn(u32) -> Result<usize>,
    {
        let mut offset = table_offset;
        let table = read_bytes_at(data, &mut offset, table_size)?;

        let mut directory = DebugDirectory::default();
        for record in table.chunks_exact(DEBUG_DIRECTORY_ENTRY_SIZE) {
            let entry = DebugDirectoryEntry::read(record)?;
            if !entry.is_portable_codeview() && !entry.is_pdb_checksum() {
                continue;
            }

            let mut raw_offset = if entry.pointer_to_raw_data != 0 {
                entry.pointer_to_raw_data as usize
            } else {
                resolve_rva(entry.address_of_raw_data)?
            };
            let raw = read_bytes_at(data, &mut raw_offset, entry.size_of_data as usize)?;

            if entry.is_portable_codeview() {
                directory.info = Some(DebugDirectoryInfo::read_codeview(raw)?);
            } else {
                directory.checksums.push(ChecksumEntry::read(raw)?);
            }
        }

        Ok(directory)
    }
}
