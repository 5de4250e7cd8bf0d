//! Shared helpers for unit tests: crafted containers, debug records and a scripted transport.

pub mod factories;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use reqwest::StatusCode;

use crate::{
    file::debug::CODEVIEW_RSDS_MAGIC,
    metadata::{
        checksum::{ChecksumAlgorithm, ChecksumEntry, PDB_ID_SIZE},
        root::{pdb_stream_offset, CIL_HEADER_MAGIC},
    },
    symbols::transport::{FetchRequest, FetchResponse, Transport},
    Error, Result,
};

/// Builds a minimal portable PDB: a metadata root with the usual heaps and a `#Pdb` stream that
/// holds only `id`. The `#Pdb` stream is laid out last and ends with the data.
pub fn crafted_pdb(id: [u8; PDB_ID_SIZE]) -> Vec<u8> {
    #[rustfmt::skip]
    let streams: [(&str, &[u8]); 6] = [
        ("#~", &[0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]),
        ("#Strings", b"\0Foo.cs\0"),
        ("#US", &[0x00, 0x00, 0x00, 0x00]),
        ("#GUID", &[0x5A; 16]),
        ("#Blob", &[0x00, 0x03, 0x01, 0x02]),
        ("#Pdb", &id),
    ];

    let mut root = Vec::new();
    root.extend(CIL_HEADER_MAGIC.to_le_bytes());
    root.extend(1_u16.to_le_bytes());
    root.extend(1_u16.to_le_bytes());
    root.extend(0_u32.to_le_bytes());
    root.extend(12_u32.to_le_bytes());
    root.extend(b"PDB v1.0\0\0\0\0");
    root.extend(0_u16.to_le_bytes());
    root.extend((streams.len() as u16).to_le_bytes());

    let headers_size: usize = streams
        .iter()
        .map(|(name, _)| 8 + ((name.len() + 1 + 3) & !3))
        .sum();

    let mut offset = root.len() + headers_size;
    let mut body = Vec::new();
    for (name, data) in streams {
        root.extend((offset as u32).to_le_bytes());
        root.extend((data.len() as u32).to_le_bytes());

        let mut padded = name.as_bytes().to_vec();
        padded.push(0);
        padded.resize((padded.len() + 3) & !3, 0);
        root.extend(padded);

        body.extend_from_slice(data);
        offset += data.len();
    }

    root.extend(body);
    root
}

/// The checksum entry a compiler would record for `pdb`.
pub fn checksum_of(pdb: &[u8], algorithm: ChecksumAlgorithm) -> ChecksumEntry {
    let mut redacted = pdb.to_vec();
    let offset = pdb_stream_offset(pdb).unwrap() as usize;
    redacted[offset..offset + PDB_ID_SIZE].fill(0);

    ChecksumEntry::new(algorithm.to_string(), algorithm.digest(&redacted))
}

/// Raw data of an `RSDS` CodeView record with age 1.
pub fn codeview_record(guid: [u8; 16], path: &str) -> Vec<u8> {
    let mut record = CODEVIEW_RSDS_MAGIC.to_le_bytes().to_vec();
    record.extend(guid);
    record.extend(1_u32.to_le_bytes());
    record.extend(path.as_bytes());
    record.push(0);
    record
}

/// Raw data of a `PdbChecksum` record.
pub fn checksum_record(name: &str, digest: &[u8]) -> Vec<u8> {
    let mut record = name.as_bytes().to_vec();
    record.push(0);
    record.extend_from_slice(digest);
    record
}

/// A 28-byte debug directory entry whose raw data is mapped at RVA `0x2000`.
pub fn debug_entry(debug_type: u32, minor_version: u16, size: u32, pointer: u32) -> Vec<u8> {
    debug_entry_at(debug_type, minor_version, size, 0x2000, pointer)
}

/// A 28-byte debug directory entry whose raw data is mapped at `rva`.
pub fn debug_entry_at(
    debug_type: u32,
    minor_version: u16,
    size: u32,
    rva: u32,
    pointer: u32,
) -> Vec<u8> {
    let mut entry = Vec::with_capacity(28);
    entry.extend(0_u32.to_le_bytes());
    entry.extend(0_u32.to_le_bytes());
    entry.extend(0x0100_u16.to_le_bytes());
    entry.extend(minor_version.to_le_bytes());
    entry.extend(debug_type.to_le_bytes());
    entry.extend(size.to_le_bytes());
    entry.extend(rva.to_le_bytes());
    entry.extend(pointer.to_le_bytes());
    entry
}

/// A [`Transport`] answering from a script, after a per-url delay.
///
/// Urls without a script fail the request.
#[derive(Debug, Default)]
pub struct FakeTransport {
    script: Mutex<HashMap<String, (StatusCode, Vec<u8>, u64)>>,
    requests: Mutex<Vec<FetchRequest>>,
    calls: AtomicUsize,
}

impl FakeTransport {
    /// Answer `url` with `status` and `body` after `delay_ms` milliseconds.
    pub fn respond(&self, url: &str, status: StatusCode, body: Vec<u8>, delay_ms: u64) {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body, delay_ms));
    }

    /// Number of requests issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request issued so far, in issue order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().get(request.url.as_str()).cloned();
        let url = request.url.to_string();
        self.requests.lock().unwrap().push(request);

        let Some((status, body, delay_ms)) = scripted else {
            return Err(Error::Error(format!("no response scripted for {url}")));
        };

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(FetchResponse { status, body })
    }
}
