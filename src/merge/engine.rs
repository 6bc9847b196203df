//! Row routing, deduplication and column pruning

use tracing::{debug, info, warn};

use super::csv_input::CsvExport;
use super::policy::{Conflict, ConflictPolicy};
use super::workbook::{rows_identical, Row, Workbook};
use super::SHEET_NAMES;

/// What happened to one input row or column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEvent {
    /// New key added to a sheet
    Appended { sheet: String, key: String },
    /// Key already present with identical values
    AlreadyExists { sheet: String, key: String },
    /// Key present with different values
    Conflict {
        sheet: String,
        key: String,
        old: Row,
        new: Row,
        replaced: bool,
    },
    /// Row whose kind names no sheet
    Unrouted { kind: String },
    /// Column dropped because no data row uses it
    ColumnPruned { sheet: String, column: String },
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub events: Vec<MergeEvent>,
}

impl MergeReport {
    fn count(&self, pred: impl Fn(&MergeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn appended(&self) -> usize {
        self.count(|e| matches!(e, MergeEvent::Appended { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|e| matches!(e, MergeEvent::AlreadyExists { .. }))
    }

    pub fn conflicts(&self) -> usize {
        self.count(|e| matches!(e, MergeEvent::Conflict { .. }))
    }

    pub fn replaced(&self) -> usize {
        self.count(|e| matches!(e, MergeEvent::Conflict { replaced: true, .. }))
    }

    pub fn unrouted(&self) -> usize {
        self.count(|e| matches!(e, MergeEvent::Unrouted { .. }))
    }

    pub fn pruned(&self) -> usize {
        self.count(|e| matches!(e, MergeEvent::ColumnPruned { .. }))
    }
}

/// Merge every row of `export` into `workbook`.
///
/// Sheets that are missing or empty get the export's header first.
pub fn merge_export(
    workbook: &mut Workbook,
    export: &CsvExport,
    policy: &mut dyn ConflictPolicy,
) -> MergeReport {
    let mut report = MergeReport::default();

    for name in SHEET_NAMES {
        let sheet = workbook.ensure_sheet(name);
        if sheet.rows.is_empty() {
            sheet.rows.push(export.header.clone());
        }
    }

    for row in &export.rows {
        let kind = export.kind_of(row).unwrap_or_default();
        let sheet = match SHEET_NAMES
            .contains(&kind)
            .then(|| workbook.sheet_mut(kind))
            .flatten()
        {
            Some(sheet) => sheet,
            None => {
                debug!(kind, "Skipping row with unknown kind");
                report.events.push(MergeEvent::Unrouted {
                    kind: kind.to_string(),
                });
                continue;
            }
        };

        let new = sheet.align(&export.header, row);
        let key = new.first().cloned().unwrap_or_default();

        let Some(idx) = sheet.find_key(&key) else {
            sheet.rows.push(new);
            report.events.push(MergeEvent::Appended {
                sheet: sheet.name.clone(),
                key,
            });
            continue;
        };

        if rows_identical(&sheet.rows[idx], &new) {
            info!(sheet = %sheet.name, key = %key, "Already exists, skipping");
            report.events.push(MergeEvent::AlreadyExists {
                sheet: sheet.name.clone(),
                key,
            });
            continue;
        }

        let replaced = policy.replace(&Conflict {
            sheet: &sheet.name,
            key: &key,
            old: &sheet.rows[idx],
            new: &new,
        });
        warn!(sheet = %sheet.name, key = %key, replaced, "Found two different versions of row");

        let old = if replaced {
            std::mem::replace(&mut sheet.rows[idx], new.clone())
        } else {
            sheet.rows[idx].clone()
        };
        report.events.push(MergeEvent::Conflict {
            sheet: sheet.name.clone(),
            key,
            old,
            new,
            replaced,
        });
    }

    for name in SHEET_NAMES {
        if let Some(sheet) = workbook.sheet_mut(name) {
            for column in sheet.prune_empty_columns() {
                info!(sheet = name, column = %column, "Deleting empty column");
                report.events.push(MergeEvent::ColumnPruned {
                    sheet: name.to_string(),
                    column,
                });
            }
        }
    }

    report
}
