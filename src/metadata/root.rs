//! Metadata root header and stream directory.
//!
//! This module defines the [`Root`] struct, which represents the metadata root and stream
//! directory as specified by ECMA-335. A portable PDB starts with exactly such a root at file
//! offset 0, followed by its streams (`#Pdb`, `#~`, `#Strings`, `#US`, `#GUID`, `#Blob`).
//!
//! # Layout
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | Signature `0x424A5342` ("BSJB")         |
//! | 4      | 2    | Major version                           |
//! | 6      | 2    | Minor version                           |
//! | 8      | 4    | Reserved                                |
//! | 12     | 4    | Length of the version string            |
//! | 16     | n    | Version string, NUL padded              |
//! | 16+n   | 2    | Flags (reserved)                        |
//! | 18+n   | 2    | Number of streams                       |
//! | 20+n   | ...  | Stream headers                          |
//!
//! # Example
//!
//! ```rust,no_run
//! use dotsym::metadata::root::Root;
//! let root = Root::read(&[
//!            0x42, 0x53, 0x4A, 0x42,
//!            0x01, 0x00,
//!            0x01, 0x00,
//!            0x00, 0x00, 0x00, 0x00,
//!            0x04, 0x00, 0x00, 0x00,
//!            b'P', b'D', b'B', 0x00,
//!            0x00, 0x00,
//!            0x01, 0x00,
//!            0x24, 0x00, 0x00, 0x00, // StreamHeader
//!            0x00, 0x00, 0x00, 0x00,
//!            b'#', b'P', b'd', b'b', 0x00, 0x00, 0x00, 0x00,
//!        ])?;
//! for stream in &root.stream_headers {
//!     println!("Stream: {} (offset: {}, size: {})", stream.name, stream.offset, stream.size);
//! }
//! # Ok::<(), dotsym::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
//! - Portable PDB v1.0, "Standalone Debugging Metadata"

use crate::{
    file::io::{read_bytes_at, read_le_at},
    metadata::streamheader::StreamHeader,
    Error::{OutOfBounds, StreamNotFound},
    Result,
};

/// The MAGIC value indicating a metadata root ("BSJB")
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Name of the portable PDB stream holding the PDB id
pub const PDB_STREAM_NAME: &str = "#Pdb";

/// Smallest possible root: all fixed fields and an empty version string
const MIN_ROOT_SIZE: usize = 20;

/// The metadata root header and its stream directory.
///
/// ## Reference
/// - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Magic signature for physical metadata: 0x424A5342
    pub signature: u32,
    /// `MajorVersion`
    pub major_version: u16,
    /// `MinorVersion`
    pub minor_version: u16,
    /// Always 0
    pub reserved: u32,
    /// Number of bytes allocated to hold version string
    pub length: u32,
    /// Version string with its NUL padding removed
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Streams, in directory order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Reads a [`Root`] metadata header from a byte slice.
    ///
    /// Every stream header must describe a range inside `data`. A root without any stream is
    /// valid, looking up a stream in it simply fails.
    ///
    /// # Errors
    /// Returns an error if the data is too short, the signature is invalid, or the stream
    /// directory is truncated or points outside of `data`.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < MIN_ROOT_SIZE {
            return Err(OutOfBounds);
        }

        let mut offset = 0;
        let signature = read_le_at::<u32>(data, &mut offset)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let major_version = read_le_at::<u16>(data, &mut offset)?;
        let minor_version = read_le_at::<u16>(data, &mut offset)?;
        let reserved = read_le_at::<u32>(data, &mut offset)?;
        let length = read_le_at::<u32>(data, &mut offset)?;

        let version_bytes = read_bytes_at(data, &mut offset, length as usize)?;
        let version_end = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_end]).into_owned();

        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count).min(16));
        for _ in 0..stream_count {
            let Some(remaining) = data.get(offset..) else {
                return Err(OutOfBounds);
            };

            let stream = StreamHeader::read(remaining)?;
            match stream.offset.checked_add(stream.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(OutOfBounds),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        stream.offset,
                        stream.size
                    ))
                }
            }

            offset += stream.header_size();
            stream_headers.push(stream);
        }

        Ok(Root {
            signature,
            major_version,
            minor_version,
            reserved,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// Returns the first stream header with the given name.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|stream| stream.name == name)
    }
}

/// Parses the metadata root at the start of `data` and returns the offset of its `#Pdb` stream.
///
/// # Errors
/// Returns [`crate::Error::StreamNotFound`] if the directory has no `#Pdb` stream, or the parse
/// error of a truncated or malformed root.
pub fn pdb_stream_offset(data: &[u8]) -> Result<u32> {
    let root = Root::read(data)?;

    root.stream(PDB_STREAM_NAME)
        .map(|stream| stream.offset)
        .ok_or(StreamNotFound(PDB_STREAM_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::crafted_pdb;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x00, 0x20,
            0x00, 0x30,
            0x00, 0x00, 0x00, 0x40,
            0x05, 0x00, 0x00, 0x00,
            b'H', b'E', b'L', b'L', b'O',
            0x00, 0x60,
            0x01, 0x00,

            0x1, 0x00, 0x00, 0x00, // StreamHeader
            0x5, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00,
        ];

        let parsed_header = Root::read(&header_bytes).unwrap();

        assert_eq!(parsed_header.signature, CIL_HEADER_MAGIC);
        assert_eq!(parsed_header.major_version, 0x2000);
        assert_eq!(parsed_header.minor_version, 0x3000);
        assert_eq!(parsed_header.reserved, 0x40000000);
        assert_eq!(parsed_header.length, 5);
        assert_eq!(parsed_header.version, "HELLO");
        assert_eq!(parsed_header.flags, 0x6000);
        assert_eq!(parsed_header.stream_headers.len(), 1);
        assert_eq!(parsed_header.stream_headers[0].offset, 0x1);
        assert_eq!(parsed_header.stream_headers[0].size, 0x5);
        assert_eq!(parsed_header.stream_headers[0].name, "#~");
    }

    #[test]
    fn finds_pdb_stream_among_many() {
        let pdb = crafted_pdb([0x42; 20]);
        let root = Root::read(&pdb).unwrap();

        assert_eq!(root.version, "PDB v1.0");
        let names: Vec<&str> = root.stream_headers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["#~", "#Strings", "#US", "#GUID", "#Blob", "#Pdb"]);

        let offset = pdb_stream_offset(&pdb).unwrap() as usize;
        assert_eq!(&pdb[offset..offset + 20], &[0x42; 20]);
    }

    #[test]
    fn zero_streams() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x00, 0x00,
        ];

        let root = Root::read(&header_bytes).unwrap();
        assert!(root.stream_headers.is_empty());
        assert!(matches!(
            pdb_stream_offset(&header_bytes),
            Err(StreamNotFound(PDB_STREAM_NAME))
        ));
    }

    #[test]
    fn truncated_everywhere() {
        // The #Pdb stream is laid out last and ends with the data, so every cut breaks the root.
        let pdb = crafted_pdb([0x42; 20]);

        for len in 0..pdb.len() {
            assert!(
                pdb_stream_offset(&pdb[..len]).is_err(),
                "truncation at {} must fail",
                len
            );
        }
    }

    #[test]
    fn bad_signature() {
        let mut pdb = crafted_pdb([0x42; 20]);
        pdb[0] = 0x43;
        assert!(matches!(
            Root::read(&pdb),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn stream_outside_data() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x01, 0x00,
            0xFF, 0xFF, 0xFF, 0xFF, // StreamHeader
            0x02, 0x00, 0x00, 0x00,
            b'#', b'P', b'd', b'b', 0x00, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(
            Root::read(&header_bytes),
            Err(crate::Error::Malformed { .. })
        ));

        let mut header_bytes = header_bytes;
        header_bytes[20..24].copy_from_slice(&[0x40, 0x00, 0x00, 0x00]);
        assert!(matches!(Root::read(&header_bytes), Err(OutOfBounds)));
    }

    #[test]
    fn huge_version_length() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0xFF, 0xFF, 0xFF, 0xFF,
            0x00, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(Root::read(&header_bytes), Err(OutOfBounds)));
    }
}
