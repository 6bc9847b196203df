//! Record store - flat directory of uploaded records and photos
//!
//! Every record is one file addressed by its name. Writes to the same name
//! are serialized so a config's backup-then-replace cannot interleave with
//! another writer of that config.

pub mod record;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{debug, info};

pub use record::{ConfigRole, RecordKind};

/// Result of writing one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No record of that name existed
    Created,
    /// An existing record was overwritten
    Replaced,
    /// A config record was overwritten after copying the old version aside
    BackedUp,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid record name: {0:?}")]
    InvalidName(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub struct RecordStore {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RecordStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        info!(path = %root.display(), "Record store opened");
        Ok(Self {
            root,
            locks: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        record::validate_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.path_of(name).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_of(name)?;
        fs::read(&path).map_err(|e| StoreError::io(&path, e))
    }

    /// Write a record, overwriting any record of the same name.
    ///
    /// Config records keep their previous version as `{name}.bak`.
    pub fn write(&self, name: &str, data: &[u8]) -> Result<WriteOutcome, StoreError> {
        let path = self.path_of(name)?;
        let lock = self.lock_for(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let existed = path.is_file();
        let mut outcome = if existed {
            WriteOutcome::Replaced
        } else {
            WriteOutcome::Created
        };

        if existed && ConfigRole::of(name).is_some() {
            let backup = self.root.join(record::backup_name(name));
            fs::copy(&path, &backup).map_err(|e| StoreError::io(&backup, e))?;
            debug!(record = name, backup = %backup.display(), "Config backed up");
            outcome = WriteOutcome::BackedUp;
        }

        fs::write(&path, data).map_err(|e| StoreError::io(&path, e))?;
        debug!(record = name, bytes = data.len(), ?outcome, "Record written");
        Ok(outcome)
    }

    /// Store a photo as `{subject}-{n}.png` using the first unused `n`.
    pub fn store_photo(&self, subject: &str, data: &[u8]) -> Result<String, StoreError> {
        record::validate_name(subject)?;
        let mut n: u64 = 0;
        loop {
            let name = format!("{}-{}.png", subject, n);
            let path = self.root.join(&name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(data).map_err(|e| StoreError::io(&path, e))?;
                    info!(photo = %name, bytes = data.len(), "Photo stored");
                    return Ok(name);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
    }

    /// Names of all regular files in the store, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StoreError::io(&entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn list_kind(&self, kind: RecordKind) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| kind.matches(name))
            .collect())
    }

    /// Pictures grouped by subject, each list ordered by picture number.
    pub fn list_pictures(&self) -> Result<BTreeMap<String, Vec<String>>, StoreError> {
        let mut grouped: BTreeMap<String, Vec<(Option<u64>, String)>> = BTreeMap::new();
        for name in self.list()? {
            if let Some((subject, n)) = record::picture_parts(&name) {
                grouped
                    .entry(subject.to_string())
                    .or_default()
                    .push((n, name.clone()));
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(subject, mut pics)| {
                // numbered pictures first, in numeric order
                pics.sort_by(|a, b| match (a.0, b.0) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => a.1.cmp(&b.1),
                });
                (subject, pics.into_iter().map(|(_, name)| name).collect())
            })
            .collect())
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks.entry(name.to_string()).or_default().clone()
    }
}
