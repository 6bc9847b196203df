//! xlsx persistence for [`Workbook`]

use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use rust_xlsxwriter::XlsxError;
use tracing::debug;

use super::workbook::{Sheet, Workbook};
use super::MergeError;

/// Load every sheet, in workbook order, as rows of display strings
pub fn read_workbook(path: &Path) -> Result<Workbook, MergeError> {
    let mut xlsx: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| MergeError::WorkbookRead(e.to_string()))?;

    let mut workbook = Workbook::new();
    for name in xlsx.sheet_names() {
        let range = xlsx
            .worksheet_range(&name)
            .map_err(|e| MergeError::WorkbookRead(format!("{name}: {e}")))?;

        // Ranges start at the first used cell, not at A1
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut sheet = Sheet::new(name);
        sheet.rows.resize(row_offset, Vec::new());
        for cells in range.rows() {
            let mut row = vec![String::new(); col_offset];
            row.extend(cells.iter().map(|c| c.to_string()));
            while row.last().is_some_and(String::is_empty) {
                row.pop();
            }
            sheet.rows.push(row);
        }
        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Read sheet");
        workbook.sheets.push(sheet);
    }
    Ok(workbook)
}

/// Write the workbook, replacing any existing file
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<(), MergeError> {
    let mut out = rust_xlsxwriter::Workbook::new();
    for sheet in &workbook.sheets {
        let worksheet = out.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        for (r, row) in sheet.rows.iter().enumerate() {
            let r = u32::try_from(r).map_err(|_| XlsxError::RowColumnLimitError)?;
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let c = u16::try_from(c).map_err(|_| XlsxError::RowColumnLimitError)?;
                match as_number(value) {
                    Some(n) => worksheet.write_number(r, c, n)?,
                    None => worksheet.write_string(r, c, value)?,
                };
            }
        }
    }
    out.save(path)?;
    Ok(())
}

/// Numbers are stored as numbers only when they read back unchanged
fn as_number(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && n.to_string() == value)
}
