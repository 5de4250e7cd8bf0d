//! Bounds-checked little-endian reads over byte slices.
//!
//! Every structure this crate parses (PE debug directory entries, CodeView records, PDB checksum
//! records and the metadata root of a portable PDB) is little-endian and comes from untrusted
//! input. The helpers here never index out of range: a read that would run past the end of the
//! buffer returns [`crate::Error::OutOfBounds`] instead.
//!
//! # Key Components
//!
//! - [`crate::file::io::Primitive`] - Trait implemented by the integer types we decode
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::read_bytes_at`] - Borrow a fixed number of bytes and advance the offset
//! - [`crate::file::io::read_cstr_at`] - Read a NUL-terminated UTF-8 string, advance past the NUL
//!
//! # Examples
//!
//! ```rust,ignore
//! use dotsym::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;  // offset: 0 -> 2
//! let second: u16 = read_le_at(&data, &mut offset)?; // offset: 2 -> 4
//! let third: u32 = read_le_at(&data, &mut offset)?;  // offset: 4 -> 8
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! assert_eq!(offset, 8);
//! # Ok::<(), dotsym::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Integer types that can be decoded from little-endian bytes.
pub trait Primitive: Sized {
    /// Associated byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),*) => {
        $(
            impl Primitive for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_primitive!(u8, u16, u32, u64);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: Primitive>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the
/// offset by the size of `T`.
///
/// On error the offset is left untouched.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: Primitive>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let bytes = read_bytes_at(data, offset, type_len)?;

    let Ok(read) = bytes.try_into() else {
        return Err(OutOfBounds);
    };

    Ok(T::from_le_bytes(read))
}

/// Borrows `len` bytes at `offset`, advancing the offset past them.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the range does not fit into `data`.
pub fn read_bytes_at<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let Some(end) = offset.checked_add(len) else {
        return Err(OutOfBounds);
    };

    if end > data.len() {
        return Err(OutOfBounds);
    }

    let bytes = &data[*offset..end];
    *offset = end;

    Ok(bytes)
}

/// Reads a NUL-terminated UTF-8 string at `offset`, advancing the offset past the terminator.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if no terminator is found before the end of `data`, or
/// a malformed error if the bytes are not valid UTF-8.
pub fn read_cstr_at<'a>(data: &'a [u8], offset: &mut usize) -> Result<&'a str> {
    let Some(rest) = data.get(*offset..) else {
        return Err(OutOfBounds);
    };

    let Some(len) = rest.iter().position(|byte| *byte == 0) else {
        return Err(OutOfBounds);
    };

    let text = std::str::from_utf8(&rest[..len])
        .map_err(|error| malformed_error!("String is not valid UTF-8 - {}", error))?;
    *offset += len + 1;

    Ok(text)
}
