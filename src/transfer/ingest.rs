//! Archive ingester
//!
//! Writes an uploaded zip to the temporary archive path and extracts each
//! file entry into the record store under its bare file name.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use base64::Engine;
use tracing::{debug, info, warn};

use super::{TempArchive, TransferError};
use crate::store::{RecordStore, StoreError};

const ZIP_MAGIC: &[u8] = b"PK";

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_RESERVE: u64 = 1024 * 1024;

/// Older clients post the archive as base64 text, optionally as a data URL.
pub fn normalize_payload(body: Vec<u8>) -> Vec<u8> {
    if body.starts_with(ZIP_MAGIC) {
        return body;
    }
    let text = match std::str::from_utf8(&body) {
        Ok(text) => text.trim(),
        Err(_) => return body,
    };
    let encoded = match text.find("base64,") {
        Some(idx) => &text[idx + "base64,".len()..],
        None => text,
    };
    match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(decoded) => {
            debug!(bytes = decoded.len(), "Decoded base64 upload");
            decoded
        }
        Err(_) => body,
    }
}

/// Extract an uploaded archive into the store, returning the number of
/// records written. The temporary archive is gone when this returns.
///
/// Entries are read up to `max_entry_bytes`; the sizes declared inside the
/// archive are not trusted.
pub fn ingest_archive(
    store: &RecordStore,
    temp_path: &Path,
    payload: &[u8],
    max_entry_bytes: u64,
) -> Result<usize, TransferError> {
    let archive = TempArchive::new(temp_path);
    std::fs::write(archive.path(), payload)
        .map_err(|e| TransferError::from(StoreError::io(temp_path, e)))?;

    let file = File::open(archive.path())
        .map_err(|e| TransferError::from(StoreError::io(temp_path, e)))?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|e| TransferError::ArchiveCorrupt(e.to_string()))?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| TransferError::ArchiveCorrupt(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }

        let name = match entry
            .enclosed_name()
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
        {
            Some(name) => name.to_string(),
            None => {
                warn!(entry = entry.name(), "Skipping unsafe archive entry");
                continue;
            }
        };

        let mut data = Vec::with_capacity(entry.size().min(MAX_RESERVE) as usize);
        entry
            .by_ref()
            .take(max_entry_bytes.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| TransferError::ArchiveCorrupt(format!("{}: {}", name, e)))?;
        if data.len() as u64 > max_entry_bytes {
            return Err(TransferError::ArchiveCorrupt(format!(
                "{}: entry larger than {} bytes",
                name, max_entry_bytes
            )));
        }

        store
            .write(&name, &data)
            .map_err(|source| TransferError::Filesystem { written, source })?;
        written += 1;
    }

    info!(count = written, "Archive ingested");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    const LIMIT: u64 = 1024 * 1024;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    fn store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("uploads")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_ingest_counts_files_not_directories() {
        let (dir, store) = store();
        let payload = build_zip(&[
            ("nested/", b""),
            ("nested/pit-2024miket-111.json", b"{\"a\":1}"),
            ("match-2024miket-1-111.json", b"{}"),
        ]);
        let temp = dir.path().join("tmp.zip");

        assert_eq!(ingest_archive(&store, &temp, &payload, LIMIT).unwrap(), 2);
        assert_eq!(store.read("pit-2024miket-111.json").unwrap(), b"{\"a\":1}");
        assert!(!store.root().join("nested").exists());
        assert!(!temp.exists());
    }

    #[test]
    fn test_corrupt_archive() {
        let (dir, store) = store();
        let temp = dir.path().join("tmp.zip");
        let err = ingest_archive(&store, &temp, b"definitely not a zip", LIMIT).unwrap_err();
        assert!(matches!(err, TransferError::ArchiveCorrupt(_)));
        assert!(!temp.exists());
        assert!(store.list().unwrap().is_empty());
    }

    /// Rewrite the uncompressed size recorded in the local and central
    /// headers of a single-entry archive.
    fn forge_uncompressed_size(mut payload: Vec<u8>, size: u32) -> Vec<u8> {
        let patch = |payload: &mut Vec<u8>, signature: &[u8], offset: usize| {
            let at = payload
                .windows(4)
                .position(|w| w == signature)
                .expect("header present");
            payload[at + offset..at + offset + 4].copy_from_slice(&size.to_le_bytes());
        };
        patch(&mut payload, b"PK\x03\x04", 22);
        patch(&mut payload, b"PK\x01\x02", 24);
        payload
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        let (dir, store) = store();
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("pit-2024miket-111.json", stored).unwrap();
        zip.write_all(b"{\"a\":1}").unwrap();
        let payload = forge_uncompressed_size(zip.finish().unwrap().into_inner(), 0xFFFF_FFF0);
        let temp = dir.path().join("tmp.zip");

        assert_eq!(ingest_archive(&store, &temp, &payload, LIMIT).unwrap(), 1);
        assert_eq!(store.read("pit-2024miket-111.json").unwrap(), b"{\"a\":1}");
        assert!(!temp.exists());
    }

    #[test]
    fn test_entry_over_limit_is_rejected() {
        let (dir, store) = store();
        let payload = build_zip(&[("pit-2024miket-111.json", b"0123456789")]);
        let temp = dir.path().join("tmp.zip");

        let err = ingest_archive(&store, &temp, &payload, 4).unwrap_err();
        assert!(matches!(err, TransferError::ArchiveCorrupt(_)));
        assert!(!store.contains("pit-2024miket-111.json"));
        assert!(!temp.exists());
    }

    #[test]
    fn test_unsafe_entries_skipped() {
        let (dir, store) = store();
        let payload = build_zip(&[
            ("../escape.json", b"{}"),
            ("/absolute.json", b"{}"),
            ("pit-2024miket-111.json", b"{}"),
        ]);
        let temp = dir.path().join("tmp.zip");

        assert_eq!(ingest_archive(&store, &temp, &payload, LIMIT).unwrap(), 1);
        assert_eq!(store.list().unwrap(), vec!["pit-2024miket-111.json"]);
        assert!(!dir.path().join("escape.json").exists());
    }

    #[test]
    fn test_write_failure_reports_partial_count() {
        let (dir, store) = store();
        // a directory where the second record should go makes its write fail
        std::fs::create_dir(store.root().join("match-2024miket-1-111.json")).unwrap();
        let payload = build_zip(&[
            ("pit-2024miket-111.json", b"{}"),
            ("match-2024miket-1-111.json", b"{}"),
            ("note-2024miket-1-111.json", b"{}"),
        ]);
        let temp = dir.path().join("tmp.zip");

        let err = ingest_archive(&store, &temp, &payload, LIMIT).unwrap_err();
        assert!(matches!(err, TransferError::Filesystem { written: 1, .. }));
        assert_eq!(
            crate::transfer::TransferResponse::from(&err),
            crate::transfer::TransferResponse { success: false, count: 1 }
        );
        assert!(store.contains("pit-2024miket-111.json"));
        assert!(!store.contains("note-2024miket-1-111.json"));
        assert!(!temp.exists());
    }

    #[test]
    fn test_base64_payload_is_decoded() {
        let payload = build_zip(&[("note-2024miket-1-111.json", b"{}")]);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&payload);
        assert_eq!(normalize_payload(encoded.clone().into_bytes()), payload);

        let data_url = format!("data:application/zip;base64,{}", encoded);
        assert_eq!(normalize_payload(data_url.into_bytes()), payload);
    }

    #[test]
    fn test_raw_zip_untouched() {
        let payload = build_zip(&[("a.json", b"{}")]);
        assert_eq!(normalize_payload(payload.clone()), payload);
    }
}
