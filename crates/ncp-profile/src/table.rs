//! In-memory profile tables.

use std::collections::BTreeMap;

use crate::ProfileError;

/// Categorical metadata columns, stored column-major.
///
/// Missing values are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    names: Vec<String>,
    columns: Vec<Vec<Option<String>>>,
    len: usize,
}

impl Metadata {
    /// Creates metadata from `(name, values)` columns of equal length.
    pub fn new<I>(columns: I) -> Result<Self, ProfileError>
    where
        I: IntoIterator<Item = (String, Vec<Option<String>>)>,
    {
        let mut metadata = Self::default();
        for (name, values) in columns {
            metadata.push_column(name, values)?;
        }
        Ok(metadata)
    }

    /// Creates metadata with `len` rows and no columns.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    pub fn push_column(
        &mut self,
        name: String,
        values: Vec<Option<String>>,
    ) -> Result<(), ProfileError> {
        if self.names.contains(&name) {
            return Err(ProfileError::DuplicateColumn { column: name });
        }
        if self.names.is_empty() && self.len == 0 {
            self.len = values.len();
        } else if values.len() != self.len {
            return Err(ProfileError::RowCountMismatch {
                metadata: self.len,
                features: values.len(),
            });
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        let index = self.names.iter().position(|n| n == name)?;
        Some(&self.columns[index])
    }

    /// Looks up a column, failing with an error naming `operation` if it is absent.
    pub fn require(
        &self,
        name: &str,
        operation: &'static str,
    ) -> Result<&[Option<String>], ProfileError> {
        self.column(name).ok_or_else(|| ProfileError::UnknownColumn {
            column: name.to_owned(),
            operation,
        })
    }

    /// Returns the metadata of a single row as a name-to-value map.
    #[must_use]
    pub fn row(&self, row: usize) -> BTreeMap<String, Option<String>> {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(name, values)| (name.clone(), values[row].clone()))
            .collect()
    }

    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|values| rows.iter().map(|&r| values[r].clone()).collect())
                .collect(),
            len: rows.len(),
        }
    }
}

/// Dense row-major matrix of feature values; missing values are NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Vec<f64>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Creates a matrix from row-major `values`.
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self, ProfileError> {
        let n_cols = names.len();
        let n_rows = values.len().checked_div(n_cols).unwrap_or(0);
        if n_rows * n_cols != values.len() {
            return Err(ProfileError::ShapeMismatch {
                rows: n_rows,
                columns: n_cols,
                values: values.len(),
            });
        }
        Ok(Self {
            names,
            values,
            n_rows,
        })
    }

    /// Creates a matrix from a list of rows.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, ProfileError> {
        for (row, values) in rows.iter().enumerate() {
            if values.len() != names.len() {
                return Err(ProfileError::RaggedRow {
                    row,
                    expected: names.len(),
                    found: values.len(),
                });
            }
        }
        let mut matrix = Self::new(names, rows.concat())?;
        matrix.n_rows = rows.len();
        Ok(matrix)
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.values[row * n_cols..(row + 1) * n_cols]
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols() + col]
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.n_rows).map(move |row| self.get(row, col))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(|row| self.row(row))
    }

    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let values = rows
            .iter()
            .flat_map(|&r| self.row(r).iter().copied())
            .collect();
        Self {
            names: self.names.clone(),
            values,
            n_rows: rows.len(),
        }
    }

    /// Keeps the named columns, in the order given.
    pub fn select_columns<S>(&self, names: &[S]) -> Result<Self, ProfileError>
    where
        S: AsRef<str>,
    {
        let indices = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| ProfileError::UnknownColumn {
                        column: name.to_owned(),
                        operation: "feature selection",
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let values = self
            .rows()
            .flat_map(|row| indices.iter().map(move |&c| row[c]))
            .collect();
        Ok(Self {
            names: indices.iter().map(|&c| self.names[c].clone()).collect(),
            values,
            n_rows: self.n_rows,
        })
    }
}

/// Metadata and features of the same rows.
///
/// Rows are always numbered `0..len()`; row position is the identity used by
/// pair matching and ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileTable {
    pub metadata: Metadata,
    pub features: FeatureMatrix,
}

impl ProfileTable {
    pub fn new(metadata: Metadata, features: FeatureMatrix) -> Result<Self, ProfileError> {
        if metadata.len() != features.n_rows() {
            return Err(ProfileError::RowCountMismatch {
                metadata: metadata.len(),
                features: features.n_rows(),
            });
        }
        Ok(Self { metadata, features })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Returns a new table made of `rows`, renumbered from zero.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            metadata: self.metadata.select_rows(rows),
            features: self.features.select_rows(rows),
        }
    }

    /// Returns the rows whose `column` value satisfies `predicate`, renumbered from zero.
    pub fn filter_by<F>(&self, column: &str, mut predicate: F) -> Result<Self, ProfileError>
    where
        F: FnMut(Option<&str>) -> bool,
    {
        let values = self.metadata.require(column, "row filter")?;
        let rows = values
            .iter()
            .enumerate()
            .filter(|(_, v)| predicate(v.as_deref()))
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        Ok(self.select_rows(&rows))
    }
}
