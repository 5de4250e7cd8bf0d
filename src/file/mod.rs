//! PE image access and debug directory parsing.
//!
//! This module abstracts over where an executable's bytes come from (a memory-mapped file or an
//! owned buffer) and exposes the few PE structures the resolver needs: data directories, RVA to
//! file offset translation and bounds-checked slices. On top of that,
//! [`crate::file::debug`] reads the debug directory that links an executable to its portable PDB.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - A parsed PE image over any [`crate::file::Backend`]
//! - [`crate::file::Backend`] - Trait for data sources (disk files, memory buffers)
//! - [`crate::file::io`] - Low-level bounds-checked readers
//! - [`crate::file::debug`] - Debug directory, CodeView and PDB checksum entries
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotsym::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("MyApp.dll"))?;
//! if let Some((rva, size)) = file.debug_directory() {
//!     println!("Debug directory at RVA 0x{:x}, {} bytes", rva, size);
//! }
//! # Ok::<(), dotsym::Error>(())
//! ```

pub mod debug;
pub mod io;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr, OutOfBounds},
    Result,
};
use goblin::pe::{data_directories::DataDirectoryType, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend trait for image data sources.
///
/// All implementations must be thread-safe. Only [`Backend::data`] is required, bounds-checked
/// slicing is derived from it.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let data = self.data();
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > data.len() {
            return Err(OutOfBounds);
        }

        Ok(&data[offset..offset_end])
    }

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }
}

#[self_referencing]
/// A loaded PE image.
///
/// Wraps the `goblin` parse of the image together with the bytes it borrows from, so the parsed
/// headers can be queried for as long as the `File` lives.
///
/// # Examples
///
/// ```rust,no_run
/// use dotsym::File;
///
/// let data = std::fs::read("MyApp.dll")?;
/// let file = File::from_mem(data)?;
/// println!("Loaded {} bytes", file.len());
/// # Ok::<(), dotsym::Error>(())
/// ```
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Loads and maps a PE file from the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is empty, or is not a valid PE image with an
    /// optional header.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a PE image from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or not a valid PE image with an optional header.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| match PE::parse(data.data()) {
            Ok(pe) => {
                if pe.header.optional_header.is_none() {
                    Err(malformed_error!("File does not have an OptionalHeader"))
                } else {
                    Ok(pe)
                }
            }
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Returns the total size of the loaded image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw bytes of the image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a bounds-checked slice of the image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Returns the RVA and size of a data directory, if it is present and non-empty.
    #[must_use]
    pub fn get_data_directory(&self, dir_type: DataDirectoryType) -> Option<(u32, u32)> {
        self.with_pe(|pe| {
            pe.header.optional_header.and_then(|optional_header| {
                optional_header
                    .data_directories
                    .dirs()
                    .find(|(directory_type, directory)| {
                        *directory_type == dir_type
                            && directory.virtual_address != 0
                            && directory.size != 0
                    })
                    .map(|(_, directory)| (directory.virtual_address, directory.size))
            })
        })
    }

    /// Returns the RVA and size of the debug directory, if present.
    #[must_use]
    pub fn debug_directory(&self) -> Option<(u32, u32)> {
        self.get_data_directory(DataDirectoryType::DebugTable)
    }

    /// Converts a relative virtual address into a file offset using the section table.
    ///
    /// # Errors
    ///
    /// Returns a malformed error if no section contains the RVA or a section header overflows.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 = u32::try_from(rva)
            .map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let extent = if section.virtual_size == 0 {
                    section.size_of_raw_data
                } else {
                    section.virtual_size
                };

                let Some(section_max) = section.virtual_address.checked_add(extent) else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        extent
                    ));
                };

                if section.virtual_address <= rva_u32 && rva_u32 < section_max {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::pe::{self, DebugRecord};

    #[test]
    fn empty_input() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
    }

    #[test]
    fn not_a_pe() {
        let result = File::from_mem(vec![0xCC; 512]);
        assert!(result.is_err());
    }

    #[test]
    fn crafted_pe() {
        let records = [
            DebugRecord::codeview([0x11; 16], "C:\\obj\\Foo.pdb"),
            DebugRecord::checksum("SHA256", &[0xAA; 32]),
        ];
        let image = pe::crafted_pe(&records);
        let len = image.len();

        let file = File::from_mem(image).unwrap();
        assert_eq!(file.len(), len);
        assert!(!file.is_empty());
        assert_eq!(file.debug_directory(), Some((pe::SECTION_RVA, 56)));
        assert_eq!(file.get_data_directory(DataDirectoryType::ImportTable), None);

        let table = file.rva_to_offset(pe::SECTION_RVA as usize).unwrap();
        assert_eq!(table, pe::SECTION_OFFSET as usize);
        assert_eq!(file.data_slice(table, 4).unwrap(), &[0; 4]);
        assert!(file.data_slice(len - 1, 2).is_err());
    }

    #[test]
    fn rva_to_offset_bounds() {
        let image = pe::crafted_pe(&[DebugRecord::checksum("SHA256", &[0xAA; 32])]);
        let file = File::from_mem(image).unwrap();

        // Section holds the 28 byte entry and the 39 byte record
        let start = pe::SECTION_RVA as usize;
        let last = start + 28 + 39 - 1;
        assert_eq!(
            file.rva_to_offset(last).unwrap(),
            pe::SECTION_OFFSET as usize + 28 + 39 - 1
        );
        assert!(file.rva_to_offset(last + 1).is_err());
        assert!(file.rva_to_offset(start - 1).is_err());
        assert!(file.rva_to_offset(0).is_err());
        assert!(file.rva_to_offset(usize::MAX).is_err());
    }

    #[test]
    fn no_debug_directory() {
        let file = File::from_mem(pe::crafted_pe(&[])).unwrap();
        assert_eq!(file.debug_directory(), None);
    }
}
