//! Archive packager
//!
//! Snapshots the matching records into a flat deflate zip at the temporary
//! archive path.

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::filter::CategoryFilter;
use super::{TempArchive, TransferError};
use crate::store::{RecordStore, StoreError};

/// Which records go into an archive
#[derive(Debug, Clone)]
pub enum Selection {
    /// Records accepted by a category filter (`/export`)
    Filtered(CategoryFilter),
    /// Every `.json` record, unfiltered (`/getZip`)
    AllRecords,
}

impl Selection {
    pub fn select(&self, store: &RecordStore) -> Result<Vec<String>, StoreError> {
        let names = store.list()?;
        Ok(match self {
            Selection::Filtered(filter) => {
                let scope = filter.scope();
                names
                    .into_iter()
                    .filter(|name| filter.matches_in(name, &scope))
                    .collect()
            }
            Selection::AllRecords => names
                .into_iter()
                .filter(|name| name.ends_with(".json"))
                .collect(),
        })
    }
}

/// A packaged archive on disk; the file goes away with this value.
#[derive(Debug)]
pub struct PackagedArchive {
    pub archive: TempArchive,
    pub count: usize,
}

impl PackagedArchive {
    pub fn path(&self) -> &Path {
        self.archive.path()
    }
}

/// Write the selected records into a zip at `temp_path`.
pub fn package(
    store: &RecordStore,
    selection: &Selection,
    temp_path: &Path,
) -> Result<PackagedArchive, TransferError> {
    let names = selection.select(store)?;
    let archive = TempArchive::new(temp_path);

    let file = File::create(archive.path()).map_err(|e| TransferError::Filesystem {
        written: 0,
        source: StoreError::io(temp_path, e),
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (written, name) in names.iter().enumerate() {
        let fail = |source: StoreError| TransferError::Filesystem { written, source };
        let path = store.path_of(name).map_err(fail)?;

        zip.start_file(name.as_str(), options)
            .map_err(|e| fail(StoreError::io(temp_path, io::Error::other(e.to_string()))))?;
        let mut record = File::open(&path).map_err(|e| fail(StoreError::io(&path, e)))?;
        io::copy(&mut record, &mut zip).map_err(|e| fail(StoreError::io(temp_path, e)))?;
        debug!(record = %name, "Packaged");
    }

    zip.finish().map_err(|e| TransferError::Filesystem {
        written: names.len(),
        source: StoreError::io(temp_path, io::Error::other(e.to_string())),
    })?;

    info!(count = names.len(), path = %temp_path.display(), "Archive packaged");
    Ok(PackagedArchive {
        archive,
        count: names.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::filter::Category;
    use std::io::Read;
    use tempfile::TempDir;

    fn entries(path: &Path) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        names
    }

    fn seeded() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("uploads")).unwrap();
        for name in [
            "match-2024miket-1-111.json",
            "pit-2024miket-111.json",
            "match-2023miket-1-111.json",
            "config-2024-pit.json",
            "111-0.png",
            "222-0.jpg",
        ] {
            store.write(name, name.as_bytes()).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn test_pictures_only() {
        let (dir, store) = seeded();
        let selection = Selection::Filtered(CategoryFilter::new("2024miket").with(Category::Pictures));
        let packaged = package(&store, &selection, &dir.path().join("tmp.zip")).unwrap();
        assert_eq!(packaged.count, 2);
        assert_eq!(entries(packaged.path()), vec!["111-0.png", "222-0.jpg"]);
    }

    #[test]
    fn test_entries_are_flat_copies() {
        let (dir, store) = seeded();
        let selection = Selection::Filtered(CategoryFilter::new("2024miket").with(Category::Results));
        let packaged = package(&store, &selection, &dir.path().join("tmp.zip")).unwrap();
        assert_eq!(
            entries(packaged.path()),
            vec!["match-2024miket-1-111.json", "pit-2024miket-111.json"]
        );

        let mut zip = zip::ZipArchive::new(File::open(packaged.path()).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name("pit-2024miket-111.json")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "pit-2024miket-111.json");
    }

    #[test]
    fn test_all_records_is_unfiltered_json() {
        let (dir, store) = seeded();
        let packaged = package(&store, &Selection::AllRecords, &dir.path().join("tmp.zip")).unwrap();
        assert_eq!(packaged.count, 4);
    }

    #[test]
    fn test_archive_deleted_with_value() {
        let (dir, store) = seeded();
        let path = dir.path().join("tmp.zip");
        let packaged = package(&store, &Selection::AllRecords, &path).unwrap();
        assert!(path.exists());
        drop(packaged);
        assert!(!path.exists());
    }
}
