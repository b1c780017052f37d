//! Raw tabular input.
//!
//! Tables are exchanged as JSON in "split" orientation: a list of column
//! names and a list of rows, each row holding one cell per column.
//!
//! ```json
//! { "columns": ["Metadata_line_ID", "Cells_Area"], "rows": [["L1", 12.5], ["L2", null]] }
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::ProfileError;

/// A single cell of a [`RawTable`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric value of the cell; `Null` maps to NaN, text and booleans to `None`.
    #[must_use]
    pub fn as_feature(&self) -> Option<f64> {
        match self {
            CellValue::Null => Some(f64::NAN),
            CellValue::Number(value) => Some(*value),
            CellValue::Bool(_) | CellValue::Text(_) => None,
        }
    }

    /// Metadata representation of the cell; `Null` (and NaN) is missing.
    #[must_use]
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Number(value) if value.is_nan() => None,
            CellValue::Bool(_) | CellValue::Number(_) | CellValue::Text(_) => {
                Some(self.to_string())
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str(""),
            CellValue::Bool(value) => fmt::Display::fmt(value, f),
            CellValue::Number(value) => fmt::Display::fmt(value, f),
            CellValue::Text(value) => f.write_str(value),
        }
    }
}

/// A table as read from disk, before any configuration is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Checks that every row has exactly one cell per column and that
    /// column names are unique.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].contains(column) {
                return Err(ProfileError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != self.columns.len() {
                return Err(ProfileError::RaggedRow {
                    row,
                    expected: self.columns.len(),
                    found: cells.len(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(
        &self,
        name: &str,
        operation: &'static str,
    ) -> Result<usize, ProfileError> {
        self.column_index(name)
            .ok_or_else(|| ProfileError::UnknownColumn {
                column: name.to_owned(),
                operation,
            })
    }

    /// Removes every column whose name equals, or starts with, one of `patterns`.
    ///
    /// Patterns that match nothing are ignored.
    pub fn drop_columns<S>(&mut self, patterns: &[S])
    where
        S: AsRef<str>,
    {
        let keep = self
            .columns
            .iter()
            .map(|c| !patterns.iter().any(|p| c.starts_with(p.as_ref())))
            .collect::<Vec<_>>();
        self.retain_columns(&keep);
    }

    fn retain_columns(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Renames every column found in `renames` at once, so chained renames
    /// and swaps are allowed; missing source columns are ignored.
    ///
    /// The table is left unchanged if two columns would end up with the
    /// same name.
    pub fn rename_columns(
        &mut self,
        renames: &BTreeMap<String, String>,
    ) -> Result<(), ProfileError> {
        let renamed = self
            .columns
            .iter()
            .map(|c| renames.get(c).unwrap_or(c).clone())
            .collect::<Vec<_>>();
        let mut seen = BTreeSet::new();
        if let Some(column) = renamed.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ProfileError::DuplicateColumn {
                column: column.clone(),
            });
        }
        self.columns = renamed;
        Ok(())
    }

    /// Sets `name` to `values[row]` for every row, appending the column if needed.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) {
        assert_eq!(values.len(), self.rows.len(), "one value per row");
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.columns.push(name.to_owned());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Keeps only rows for which `predicate` returns `true`.
    pub fn retain_rows<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        self.rows.retain(|row| predicate(row));
    }
}
