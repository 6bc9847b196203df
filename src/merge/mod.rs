//! CSV to workbook merge
//!
//! Consolidates a flat CSV export (one row per pit, match or note result,
//! tagged by a `kind` column) into a workbook with one sheet per kind.
//! Rows are deduplicated by their first column; conflicting versions of the
//! same key are resolved by a [`ConflictPolicy`].

pub mod csv_input;
pub mod engine;
pub mod policy;
pub mod workbook;
pub mod xlsx;

pub use csv_input::CsvExport;
pub use engine::{merge_export, MergeEvent, MergeReport};
pub use policy::{Conflict, ConflictPolicy, PromptConflicts, ReplaceConflicts, SkipConflicts};
pub use workbook::{Sheet, Workbook};

/// Sheets rows can be routed to, by `kind`
pub const SHEET_NAMES: [&str; 3] = ["pit", "match", "note"];

/// Name of the discriminator column
pub const KIND_COLUMN: &str = "kind";

/// Default output file of the merge tool
pub const DEFAULT_OUTPUT: &str = "export.xlsx";

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV export has no header row")]
    MissingHeader,

    #[error("Failed to read workbook: {0}")]
    WorkbookRead(String),

    #[error("Failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
