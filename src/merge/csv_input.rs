//! Flat CSV export reader

use std::io::Read;
use std::path::Path;

use super::{MergeError, KIND_COLUMN};

/// Column holding the kind when the header does not name one
const FALLBACK_KIND_INDEX: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    kind_index: usize,
}

impl CsvExport {
    pub fn from_path(path: &Path) -> Result<Self, MergeError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// The first record is the header. Repeated header rows further down
    /// (concatenated exports) are dropped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MergeError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Err(MergeError::MissingHeader),
        };
        let kind_index = header
            .iter()
            .position(|h| h == KIND_COLUMN)
            .unwrap_or(FALLBACK_KIND_INDEX);

        let mut rows = Vec::new();
        for record in records {
            let row: Vec<String> = record?.iter().map(str::to_string).collect();
            if row.get(kind_index).map(String::as_str) == Some(KIND_COLUMN) {
                continue;
            }
            rows.push(row);
        }

        Ok(Self {
            header,
            rows,
            kind_index,
        })
    }

    pub fn kind_of<'a>(&self, row: &'a [String]) -> Option<&'a str> {
        row.get(self.kind_index).map(String::as_str)
    }
}
