//! Stream header of a metadata root.
//!
//! Provides parsing of stream headers, which describe the name, offset, and size of each stream in
//! a metadata container such as a portable PDB.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::io::{read_cstr_at, read_le_at},
    Error::OutOfBounds,
    Result,
};

/// Longest stream name including its NUL terminator
pub const MAX_STREAM_NAME_LEN: usize = 32;

/// A stream header provides the name, and the position and length of a particular stream. The
/// length of a stream header is not fixed, it depends on the length of its name field (a NUL
/// terminated string padded to a 4-byte boundary).
///
/// Unlike an assembly's metadata, a portable PDB carries a `#Pdb` stream next to the usual heaps,
/// so any well-formed name is accepted here and callers look up the stream they care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the start of the metadata root
    pub offset: u32,
    /// Size of this stream in bytes
    pub size: u32,
    /// Name of the stream, max 32 bytes including the terminator
    pub name: String,
}

impl StreamHeader {
    /// Reads a [`StreamHeader`] from the start of `data`.
    ///
    /// # Errors
    /// Returns an error if the data is too short, the name is not terminated within 32 bytes, or
    /// the name is not valid UTF-8.
    pub fn read(data: &[u8]) -> Result<StreamHeader> {
        let mut offset = 0;
        let stream_offset = read_le_at::<u32>(data, &mut offset)?;
        let size = read_le_at::<u32>(data, &mut offset)?;

        let name_end = std::cmp::min(data.len(), offset + MAX_STREAM_NAME_LEN);
        let name = match read_cstr_at(&data[..name_end], &mut offset) {
            Ok(name) => name,
            Err(OutOfBounds) if name_end < data.len() => {
                return Err(malformed_error!(
                    "Stream header name exceeds {} bytes",
                    MAX_STREAM_NAME_LEN
                ))
            }
            Err(error) => return Err(error),
        };

        Ok(StreamHeader {
            offset: stream_offset,
            size,
            name: name.to_string(),
        })
    }

    /// Number of bytes this header occupies in the stream directory.
    #[must_use]
    pub fn header_size(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00,
        ];

        let parsed_header = StreamHeader::read(&header_bytes).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#~");
        assert_eq!(parsed_header.header_size(), 12);
    }

    #[test]
    fn crafted_pdb() {
        #[rustfmt::skip]
        let header_bytes = [
            0x20, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
            b'#', b'P', b'd', b'b', 0x00, 0x00, 0x00, 0x00,
        ];

        let parsed_header = StreamHeader::read(&header_bytes).unwrap();

        assert_eq!(parsed_header.name, "#Pdb");
        assert_eq!(parsed_header.header_size(), 16);
    }

    #[test]
    fn crafted_invalid() {
        // Name without terminator
        let header_bytes = [0x6C, 0x00, 0x00, 0x00, 0xA4, 0x45, 0x00, 0x00, 0x23, 0x7E];
        assert!(StreamHeader::read(&header_bytes).is_err());

        // Name longer than 32 bytes
        let mut header_bytes = vec![0x00; 8];
        header_bytes.extend([b'A'; 40]);
        header_bytes.push(0x00);
        assert!(matches!(
            StreamHeader::read(&header_bytes),
            Err(crate::Error::Malformed { .. })
        ));

        // Truncated before the name
        assert!(StreamHeader::read(&[0x00; 6]).is_err());
    }
}
