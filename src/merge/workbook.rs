//! In-memory workbook model
//!
//! Cells are strings; an empty string is an empty cell. The first row of a
//! sheet is its header.

pub type Row = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// Cell-wise equality, treating missing trailing cells as empty
pub fn rows_identical(a: &[String], b: &[String]) -> bool {
    (0..a.len().max(b.len())).all(|i| cell(a, i) == cell(b, i))
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Index into `rows` of the data row whose first cell is `key`
    pub fn find_key(&self, key: &str) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| cell(row, 0) == key)
            .map(|(i, _)| i)
    }

    /// Lay a CSV row out in this sheet's column order, matching columns by
    /// header name. Columns the sheet has never seen are added to its header.
    pub fn align(&mut self, csv_header: &[String], row: &[String]) -> Row {
        let Some(header) = self.rows.first_mut() else {
            return row.to_vec();
        };

        let mut positions = Vec::with_capacity(csv_header.len());
        for (i, name) in csv_header.iter().enumerate() {
            let found = if name.is_empty() {
                (i < header.len() && header[i].is_empty()).then_some(i)
            } else {
                header.iter().position(|h| h == name)
            };
            let pos = found.unwrap_or_else(|| {
                header.push(name.clone());
                header.len() - 1
            });
            positions.push(pos);
        }

        let mut aligned = vec![String::new(); header.len()];
        for (i, value) in row.iter().enumerate() {
            match positions.get(i) {
                Some(&pos) => aligned[pos] = value.clone(),
                None => aligned.push(value.clone()),
            }
        }
        aligned
    }

    /// Drop every column with no populated data cell, so a sheet without
    /// data rows loses its whole header. Returns the header names of the
    /// removed columns.
    pub fn prune_empty_columns(&mut self) -> Vec<String> {
        let width = self.width();
        let keep: Vec<bool> = (0..width)
            .map(|col| self.data_rows().iter().any(|row| !cell(row, col).is_empty()))
            .collect();

        let removed = match self.header() {
            Some(header) => keep
                .iter()
                .enumerate()
                .filter(|(_, kept)| !**kept)
                .map(|(col, _)| cell(header, col).to_string())
                .collect(),
            None => Vec::new(),
        };

        for row in &mut self.rows {
            let mut col = 0;
            row.retain(|_| {
                let kept = keep.get(col).copied().unwrap_or(false);
                col += 1;
                kept
            });
        }
        removed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Get a sheet, appending an empty one if it does not exist
    pub fn ensure_sheet(&mut self, name: &str) -> &mut Sheet {
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }
}
