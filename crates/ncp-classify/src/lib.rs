//! Group-aware classification and per-feature testing of profiles.
//!
//! Two complementary views of whether features separate a binary target:
//!
//! - [`cross_validate`] fits a logistic regression on group-disjoint
//!   train/test splits and reports held-out accuracy and feature weights.
//!   Rows of the same group (e.g. a cell line) never land on both sides of a
//!   split, so accuracy is not inflated by replicate leakage.
//! - [`univariate::mann_whitney_u_test`] tests every feature on its own with
//!   a Mann-Whitney U test and corrects the p-values for multiple testing.
//!
//! # Example
//!
//! ```
//! use ncp_classify::{cross_validate::group_kfold_cross_validate, Target};
//! use ncp_profile::FeatureMatrix;
//!
//! let features = FeatureMatrix::from_rows(
//!     vec!["signal".into()],
//!     &[vec![0.0], vec![0.2], vec![0.1], vec![1.0], vec![1.2], vec![0.9]],
//! )
//! .unwrap();
//! let target = Target::new(vec![0, 0, 0, 1, 1, 1]).unwrap();
//! let groups = ["a", "b", "c", "d", "e", "f"];
//!
//! let result = group_kfold_cross_validate(&features, &target, &groups, 3).unwrap();
//! assert_eq!(result.folds.len(), 3);
//! assert!(result.mean_accuracy > 0.5);
//! ```

use ncp_profile::ProfileError;
use ncp_stats::StatsError;

pub mod cross_validate;
pub mod imputer;
pub mod logistic;
pub mod split;
pub mod univariate;

/// Binary class labels, validated to hold both 0 and 1 and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    labels: Vec<bool>,
}

impl Target {
    /// # Errors
    ///
    /// Returns [`ClassifyError::TargetNotBinary`] unless the values are
    /// exactly the classes 0 and 1, both present.
    pub fn new(values: Vec<i64>) -> Result<Self, ClassifyError> {
        let mut found = values.clone();
        found.sort_unstable();
        found.dedup();
        if found != [0, 1] {
            return Err(ClassifyError::TargetNotBinary { found });
        }
        Ok(Self {
            labels: values.into_iter().map(|v| v == 1).collect(),
        })
    }

    /// Parses text labels `"0"` / `"1"`, e.g. an encoded metadata column.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::TargetNotBinary`] if a value is missing or
    /// not an integer, or the classes are not exactly 0 and 1.
    pub fn from_labels(values: &[Option<String>]) -> Result<Self, ClassifyError> {
        let parsed = values
            .iter()
            .map(|v| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok()))
            .collect::<Option<Vec<_>>>()
            .ok_or(ClassifyError::TargetNotBinary { found: vec![] })?;
        Self::new(parsed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    /// Labels of `rows`, in the given order.
    #[must_use]
    pub fn select(&self, rows: &[usize]) -> Vec<bool> {
        rows.iter().map(|&r| self.labels[r]).collect()
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ClassifyError {
    #[display("target must hold exactly the classes 0 and 1, found {found:?}")]
    TargetNotBinary { found: Vec<i64> },
    #[display("{what}: expected {expected} entries, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[display("cannot split {groups} groups into {n_splits} folds")]
    TooFewGroups { groups: usize, n_splits: usize },
    #[display("train size must be in (0, 1), got {train_size}")]
    InvalidTrainSize { train_size: f64 },
    #[display("training rows of fold {fold} hold a single class")]
    SingleClassFold { fold: usize },
    #[display("logistic regression did not find a descent direction")]
    IllConditioned,
    #[display("feature '{feature}' has no observation for class {class}")]
    EmptyClass { feature: String, class: u8 },
    #[display("{_0}")]
    #[from]
    Profile(ProfileError),
    #[display("{_0}")]
    #[from]
    Stats(StatsError),
}
