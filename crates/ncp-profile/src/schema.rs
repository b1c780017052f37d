//! Column consistency checks across concatenated sources.
//!
//! Profiles of one cell type are often spread over several plates whose
//! tables do not carry exactly the same columns. [`check_matching_columns`]
//! reports the differences against the first table and [`concat`] stacks the
//! tables under a [`SchemaPolicy`]: by default a mismatch is only logged and
//! missing cells are filled with nulls.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    ProfileError,
    raw::{CellValue, RawTable},
};

/// What to do when concatenated tables have differing columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    /// Log the mismatch and concatenate the union of columns.
    #[default]
    Warn,
    /// Refuse to concatenate.
    Strict,
}

/// Column differences of one table relative to the reference (first) table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMismatch {
    /// 1-based position of the table in the input list.
    pub table: usize,
    /// Columns present in this table but not in the reference.
    pub extra: Vec<String>,
    /// Columns present in the reference but not in this table.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub mismatches: Vec<TableMismatch>,
}

impl SchemaReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl fmt::Display for SchemaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consistent() {
            return f.write_str("tables have matching columns");
        }
        writeln!(f, "tables have different columns:")?;
        for mismatch in &self.mismatches {
            writeln!(f, "table {} mismatch:", mismatch.table)?;
            if !mismatch.extra.is_empty() {
                writeln!(f, "  {} extra columns:", mismatch.extra.len())?;
                for column in &mismatch.extra {
                    writeln!(f, "    {column}")?;
                }
            }
            if !mismatch.missing.is_empty() {
                writeln!(f, "  {} missing columns:", mismatch.missing.len())?;
                for column in &mismatch.missing {
                    writeln!(f, "    {column}")?;
                }
            }
        }
        Ok(())
    }
}

/// Compares the columns of every table with those of the first one.
#[must_use]
pub fn check_matching_columns(tables: &[RawTable]) -> SchemaReport {
    let Some((reference, rest)) = tables.split_first() else {
        return SchemaReport::default();
    };

    let mismatches = rest
        .iter()
        .enumerate()
        .filter_map(|(i, table)| {
            let extra = table
                .columns
                .iter()
                .filter(|c| !reference.columns.contains(c))
                .cloned()
                .collect::<Vec<_>>();
            let missing = reference
                .columns
                .iter()
                .filter(|c| !table.columns.contains(c))
                .cloned()
                .collect::<Vec<_>>();
            (!extra.is_empty() || !missing.is_empty()).then_some(TableMismatch {
                table: i + 2,
                extra,
                missing,
            })
        })
        .collect();

    SchemaReport { mismatches }
}

/// Stacks `tables` row-wise over the union of their columns.
///
/// Columns keep their first-seen order. Cells of columns a table does not
/// have are null.
pub fn concat(tables: Vec<RawTable>, policy: SchemaPolicy) -> Result<RawTable, ProfileError> {
    if tables.is_empty() {
        return Err(ProfileError::NoTables);
    }
    for table in &tables {
        table.validate()?;
    }

    let report = check_matching_columns(&tables);
    if !report.is_consistent() {
        match policy {
            SchemaPolicy::Warn => tracing::warn!("{report}"),
            SchemaPolicy::Strict => return Err(ProfileError::SchemaMismatch { report }),
        }
    }

    let mut columns: Vec<String> = vec![];
    for table in &tables {
        for column in &table.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut rows = vec![];
    for table in tables {
        let positions = columns
            .iter()
            .map(|c| table.column_index(c))
            .collect::<Vec<_>>();
        for mut row in table.rows {
            let cells = positions
                .iter()
                .map(|pos| pos.map_or(CellValue::Null, |p| std::mem::take(&mut row[p])))
                .collect();
            rows.push(cells);
        }
    }

    Ok(RawTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: usize) -> RawTable {
        RawTable {
            columns: columns.iter().map(|&c| c.to_owned()).collect(),
            rows: (0..rows)
                .map(|r| {
                    (0..columns.len())
                        .map(|c| CellValue::Number((r * 10 + c) as f64))
                        .collect()
                })
                .collect(),
        }
    }

    #[test]
    fn test_matching_columns() {
        let report = check_matching_columns(&[table(&["a", "b"], 1), table(&["b", "a"], 2)]);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_mismatch_report() {
        let report = check_matching_columns(&[
            table(&["a", "b"], 1),
            table(&["a", "b"], 1),
            table(&["a", "c"], 1),
        ]);
        assert_eq!(
            report.mismatches,
            vec![TableMismatch {
                table: 3,
                extra: vec!["c".into()],
                missing: vec!["b".into()],
            }]
        );
        let text = report.to_string();
        assert!(text.contains("table 3 mismatch"));
        assert!(text.contains("1 extra columns"));
    }

    #[test]
    fn test_concat_warn_fills_nulls() {
        let merged = concat(
            vec![table(&["a", "b"], 1), table(&["a", "c"], 2)],
            SchemaPolicy::Warn,
        )
        .unwrap();
        assert_eq!(merged.columns, ["a", "b", "c"]);
        assert_eq!(merged.rows.len(), 3);
        assert_eq!(merged.rows[0][2], CellValue::Null);
        assert_eq!(merged.rows[1][1], CellValue::Null);
        assert_eq!(merged.rows[2][2], CellValue::Number(11.0));
    }

    #[test]
    fn test_concat_strict_rejects_mismatch() {
        let result = concat(
            vec![table(&["a", "b"], 1), table(&["a"], 1)],
            SchemaPolicy::Strict,
        );
        assert!(matches!(result, Err(ProfileError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_concat_empty() {
        assert_eq!(
            concat(vec![], SchemaPolicy::Warn),
            Err(ProfileError::NoTables)
        );
    }
}
