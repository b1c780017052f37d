//! Load-time table configuration.
//!
//! All column selection happens here, once, before any analysis runs. The
//! analysis crates receive a [`ProfileTable`] whose feature columns are
//! already chosen and never match column names against patterns themselves.

use std::collections::BTreeMap;

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    FeatureMatrix, Metadata, ProfileError, ProfileTable,
    raw::{CellValue, RawTable},
    schema::{self, SchemaPolicy},
};

/// Keeps rows whose `column` value (as text) is one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub values: Vec<String>,
}

/// Expression producing a derived column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnExpr {
    /// Copy of another column.
    Copy { column: String },
    /// Text values of `columns` joined by `separator`; null if any is null.
    Concat {
        columns: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// `numerator / denominator`; null unless both are numbers and the
    /// denominator is non-zero.
    Ratio {
        numerator: String,
        denominator: String,
    },
}

fn default_separator() -> String {
    "_".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedColumn {
    pub name: String,
    pub expr: ColumnExpr,
}

/// Seeded random subset of the feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSubsample {
    pub count: usize,
    pub seed: u64,
}

/// Which columns hold features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSelector {
    /// A column is a feature if its name starts with one of these prefixes.
    pub prefixes: Vec<String>,
    /// Feature columns to leave out.
    pub exclude: Vec<String>,
    pub subsample: Option<FeatureSubsample>,
}

impl FeatureSelector {
    fn matches(&self, column: &str) -> bool {
        self.prefixes.iter().any(|p| column.starts_with(p.as_str()))
    }

    fn is_feature(&self, column: &str) -> bool {
        self.matches(column) && !self.exclude.iter().any(|e| e == column)
    }
}

/// Declarative description of how raw tables become a [`ProfileTable`].
///
/// Steps are applied in a fixed order: per source table drop, rename, add
/// constants, compute; then concatenate, filter rows, split features from
/// metadata and subsample features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Columns to drop; an entry matches a column equal to it or starting with it.
    pub drop_columns: Vec<String>,
    pub rename: BTreeMap<String, String>,
    /// Constant columns added to every source table.
    pub add_columns: BTreeMap<String, CellValue>,
    pub computed_columns: Vec<ComputedColumn>,
    pub schema_policy: SchemaPolicy,
    pub row_filters: Vec<RowFilter>,
    pub features: FeatureSelector,
}

impl TableConfig {
    /// Applies the configuration to `tables` and builds the profile table.
    pub fn load(&self, tables: Vec<RawTable>) -> Result<ProfileTable, ProfileError> {
        let tables = tables
            .into_iter()
            .map(|table| self.prepare(table))
            .collect::<Result<Vec<_>, _>>()?;
        let mut table = schema::concat(tables, self.schema_policy)?;

        for filter in &self.row_filters {
            let index = table.require_column(&filter.column, "row filter")?;
            table.retain_rows(|row| {
                row[index]
                    .as_label()
                    .is_some_and(|v| filter.values.contains(&v))
            });
        }

        let table = self.split(&table)?;
        tracing::info!(
            rows = table.len(),
            features = table.features.n_cols(),
            metadata = table.metadata.names().len(),
            "profile table loaded"
        );
        Ok(table)
    }

    fn prepare(&self, mut table: RawTable) -> Result<RawTable, ProfileError> {
        table.validate()?;
        table.drop_columns(&self.drop_columns);
        table.rename_columns(&self.rename)?;
        for (name, value) in &self.add_columns {
            table.set_column(name, vec![value.clone(); table.rows.len()]);
        }
        for computed in &self.computed_columns {
            let values = evaluate(&table, &computed.expr)?;
            table.set_column(&computed.name, values);
        }
        Ok(table)
    }

    fn split(&self, table: &RawTable) -> Result<ProfileTable, ProfileError> {
        let mut feature_columns = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| self.features.is_feature(name))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        if let Some(subsample) = self.features.subsample {
            let mut rng = Pcg64::seed_from_u64(subsample.seed);
            feature_columns.shuffle(&mut rng);
            feature_columns.truncate(subsample.count);
            // keep table order for the chosen subset
            feature_columns.sort_unstable();
        }
        if feature_columns.is_empty() {
            return Err(ProfileError::NoFeatureColumns);
        }

        let mut values = Vec::with_capacity(table.rows.len() * feature_columns.len());
        for (row, cells) in table.rows.iter().enumerate() {
            for &col in &feature_columns {
                let value = cells[col]
                    .as_feature()
                    .ok_or_else(|| ProfileError::NonNumericFeature {
                        column: table.columns[col].clone(),
                        row,
                    })?;
                values.push(value);
            }
        }
        let names = feature_columns
            .iter()
            .map(|&c| table.columns[c].clone())
            .collect();
        let features = FeatureMatrix::new(names, values)?;

        let mut metadata = Metadata::with_len(table.rows.len());
        for (col, name) in table.columns.iter().enumerate() {
            // unselected feature columns are not metadata either
            if self.features.matches(name) {
                continue;
            }
            let values = table.rows.iter().map(|row| row[col].as_label()).collect();
            metadata.push_column(name.clone(), values)?;
        }

        ProfileTable::new(metadata, features)
    }
}

fn evaluate(table: &RawTable, expr: &ColumnExpr) -> Result<Vec<CellValue>, ProfileError> {
    const OPERATION: &str = "computed column";
    let values = match expr {
        ColumnExpr::Copy { column } => {
            let index = table.require_column(column, OPERATION)?;
            table.rows.iter().map(|row| row[index].clone()).collect()
        }
        ColumnExpr::Concat { columns, separator } => {
            let indices = columns
                .iter()
                .map(|c| table.require_column(c, OPERATION))
                .collect::<Result<Vec<_>, _>>()?;
            table
                .rows
                .iter()
                .map(|row| {
                    indices
                        .iter()
                        .map(|&i| row[i].as_label())
                        .collect::<Option<Vec<_>>>()
                        .map_or(CellValue::Null, |parts| {
                            CellValue::Text(parts.join(separator))
                        })
                })
                .collect()
        }
        ColumnExpr::Ratio {
            numerator,
            denominator,
        } => {
            let num = table.require_column(numerator, OPERATION)?;
            let den = table.require_column(denominator, OPERATION)?;
            table
                .rows
                .iter()
                .map(|row| match (&row[num], &row[den]) {
                    (CellValue::Number(n), CellValue::Number(d)) if *d != 0.0 => {
                        CellValue::Number(n / d)
                    }
                    _ => CellValue::Null,
                })
                .collect()
        }
    };
    Ok(values)
}
