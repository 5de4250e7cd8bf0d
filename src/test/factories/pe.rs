//! Factory for minimal PE32 images carrying a debug directory.
//!
//! The image has the DOS and COFF headers, a PE32 optional header with all 16 data directories
//! and a single `.rdata` section. The section starts with the debug directory table, followed by
//! the raw data of every record, each 4-byte aligned.

use crate::{
    file::debug::{
        DEBUG_DIRECTORY_ENTRY_SIZE, IMAGE_DEBUG_TYPE_CODEVIEW, IMAGE_DEBUG_TYPE_PDBCHECKSUM,
        PORTABLE_CODEVIEW_MINOR_VERSION,
    },
    test::{checksum_record, codeview_record, debug_entry_at},
};

/// File offset of the `PE\0\0` signature
pub const PE_OFFSET: usize = 0x80;
/// RVA of the only section
pub const SECTION_RVA: u32 = 0x1000;
/// File offset of the only section, equal to `SizeOfHeaders`
pub const SECTION_OFFSET: u32 = 0x200;

const FILE_ALIGNMENT: usize = 0x200;
const SECTION_ALIGNMENT: usize = 0x1000;
const DEBUG_DATA_DIRECTORY: usize = 6;

/// One record of the crafted debug directory.
#[derive(Debug, Clone)]
pub struct DebugRecord {
    debug_type: u32,
    minor_version: u16,
    data: Vec<u8>,
    rva_only: bool,
}

impl DebugRecord {
    /// A portable CodeView record.
    pub fn codeview(guid: [u8; 16], path: &str) -> Self {
        Self::raw(
            IMAGE_DEBUG_TYPE_CODEVIEW,
            PORTABLE_CODEVIEW_MINOR_VERSION,
            codeview_record(guid, path),
        )
    }

    /// A `PdbChecksum` record.
    pub fn checksum(name: &str, digest: &[u8]) -> Self {
        Self::raw(IMAGE_DEBUG_TYPE_PDBCHECKSUM, 0, checksum_record(name, digest))
    }

    /// Any record type with the given raw data.
    pub fn raw(debug_type: u32, minor_version: u16, data: Vec<u8>) -> Self {
        DebugRecord {
            debug_type,
            minor_version,
            data,
            rva_only: false,
        }
    }

    /// Leaves `PointerToRawData` at zero, so the data is only reachable through its RVA.
    pub fn rva_only(mut self) -> Self {
        self.rva_only = true;
        self
    }
}

/// Builds a PE32 image whose debug directory holds `records`, in order.
///
/// With no records the debug data directory is left empty.
pub fn crafted_pe(records: &[DebugRecord]) -> Vec<u8> {
    let section = section_data(records);
    let virtual_size = section.len();
    let raw_size = align(virtual_size.max(1), FILE_ALIGNMENT);
    let debug_size = records.len() * DEBUG_DIRECTORY_ENTRY_SIZE;

    let mut image = vec![0_u8; SECTION_OFFSET as usize];

    // DOS header, e_lfanew
    image[0..2].copy_from_slice(b"MZ");
    put_u32(&mut image, 0x3C, PE_OFFSET as u32);

    // PE signature and COFF header
    let mut offset = PE_OFFSET;
    put(&mut image, &mut offset, b"PE\0\0");
    put(&mut image, &mut offset, &0x014C_u16.to_le_bytes());
    put(&mut image, &mut offset, &1_u16.to_le_bytes());
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &0xE0_u16.to_le_bytes());
    put(&mut image, &mut offset, &0x0102_u16.to_le_bytes());

    // Optional header, standard fields
    put(&mut image, &mut offset, &0x010B_u16.to_le_bytes());
    put(&mut image, &mut offset, &[0x30, 0x00]);
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &(raw_size as u32).to_le_bytes());
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &SECTION_RVA.to_le_bytes());

    // Optional header, windows fields
    let size_of_image = SECTION_RVA as usize + align(virtual_size.max(1), SECTION_ALIGNMENT);
    put(&mut image, &mut offset, &0x0040_0000_u32.to_le_bytes());
    put(&mut image, &mut offset, &(SECTION_ALIGNMENT as u32).to_le_bytes());
    put(&mut image, &mut offset, &(FILE_ALIGNMENT as u32).to_le_bytes());
    for version in [4_u16, 0, 0, 0, 4, 0] {
        put(&mut image, &mut offset, &version.to_le_bytes());
    }
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &(size_of_image as u32).to_le_bytes());
    put(&mut image, &mut offset, &SECTION_OFFSET.to_le_bytes());
    put(&mut image, &mut offset, &0_u32.to_le_bytes());
    put(&mut image, &mut offset, &3_u16.to_le_bytes());
    put(&mut image, &mut offset, &0x8540_u16.to_le_bytes());
    for reserve in [0x0010_0000_u32, 0x1000, 0x0010_0000, 0x1000, 0] {
        put(&mut image, &mut offset, &reserve.to_le_bytes());
    }
    put(&mut image, &mut offset, &16_u32.to_le_bytes());

    // Data directories
    for index in 0..16 {
        let (rva, size) = if index == DEBUG_DATA_DIRECTORY && debug_size != 0 {
            (SECTION_RVA, debug_size as u32)
        } else {
            (0, 0)
        };
        put(&mut image, &mut offset, &rva.to_le_bytes());
        put(&mut image, &mut offset, &size.to_le_bytes());
    }

    // Section table
    put(&mut image, &mut offset, b".rdata\0\0");
    put(&mut image, &mut offset, &(virtual_size as u32).to_le_bytes());
    put(&mut image, &mut offset, &SECTION_RVA.to_le_bytes());
    put(&mut image, &mut offset, &(raw_size as u32).to_le_bytes());
    put(&mut image, &mut offset, &SECTION_OFFSET.to_le_bytes());
    put(&mut image, &mut offset, &[0; 12]);
    put(&mut image, &mut offset, &0x4000_0040_u32.to_le_bytes());

    image.extend(section);
    image.resize(SECTION_OFFSET as usize + raw_size, 0);
    image
}

/// The debug directory table followed by the record data.
fn section_data(records: &[DebugRecord]) -> Vec<u8> {
    let table_size = records.len() * DEBUG_DIRECTORY_ENTRY_SIZE;
    let mut table = Vec::with_capacity(table_size);
    let mut raw = Vec::new();

    for record in records {
        let position = align(table_size + raw.len(), 4);
        raw.resize(position - table_size, 0);

        let rva = SECTION_RVA + position as u32;
        let pointer = if record.rva_only {
            0
        } else {
            SECTION_OFFSET + position as u32
        };

        table.extend(debug_entry_at(
            record.debug_type,
            record.minor_version,
            record.data.len() as u32,
            rva,
            pointer,
        ));
        raw.extend_from_slice(&record.data);
    }

    table.extend(raw);
    table
}

fn align(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

fn put(image: &mut [u8], offset: &mut usize, bytes: &[u8]) {
    image[*offset..*offset + bytes.len()].copy_from_slice(bytes);
    *offset += bytes.len();
}

fn put_u32(image: &mut [u8], offset: usize, value: u32) {
    image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
