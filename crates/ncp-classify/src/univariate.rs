//! Per-feature Mann-Whitney U tests with false discovery rate control.

use ncp_profile::ProfileTable;
use ncp_stats::{correction::FdrCorrection, mann_whitney::mann_whitney_u};
use serde::{Deserialize, Serialize};

use crate::{ClassifyError, Target};

/// Test outcome of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UTestResult {
    pub feature: String,
    /// U statistic of the class-0 sample.
    pub u_statistic: f64,
    pub p_value: f64,
    /// Benjamini-Hochberg adjusted p-value.
    pub q_value: f64,
    pub significant: bool,
}

/// Tests every feature of `table` named in `feature_cols` between the rows
/// of class 0 and class 1 of the metadata column `target_col`.
///
/// The target column must hold the text labels `"0"` and `"1"` only. Missing
/// feature values are left out of the test. A feature is significant when
/// its q-value is below `alpha`.
///
/// # Errors
///
/// - [`ClassifyError::Profile`] if a named column does not exist
/// - [`ClassifyError::TargetNotBinary`] if the target is not exactly {0, 1}
/// - [`ClassifyError::EmptyClass`] if a feature has no observation in a class
pub fn mann_whitney_u_test<S>(
    table: &ProfileTable,
    feature_cols: &[S],
    target_col: &str,
    alpha: f64,
) -> Result<Vec<UTestResult>, ClassifyError>
where
    S: AsRef<str>,
{
    let target = Target::from_labels(table.metadata.require(target_col, "U test")?)?;
    let features = table.features.select_columns(feature_cols)?;

    let mut tests = Vec::with_capacity(features.n_cols());
    for (col, name) in features.names().iter().enumerate() {
        let mut class0 = vec![];
        let mut class1 = vec![];
        for (value, &label) in features.column(col).zip(target.labels()) {
            if value.is_nan() {
                continue;
            }
            if label {
                class1.push(value);
            } else {
                class0.push(value);
            }
        }
        for (class, sample) in [(0, &class0), (1, &class1)] {
            if sample.is_empty() {
                return Err(ClassifyError::EmptyClass {
                    feature: name.clone(),
                    class,
                });
            }
        }
        tests.push((name, mann_whitney_u(&class0, &class1)?));
    }

    let p_values = tests.iter().map(|(_, t)| t.p_value).collect::<Vec<_>>();
    let correction = FdrCorrection::benjamini_hochberg(&p_values, alpha)?;
    let results = tests
        .into_iter()
        .zip(correction.q_values)
        .map(|((name, test), q_value)| UTestResult {
            feature: name.clone(),
            u_statistic: test.statistic,
            p_value: test.p_value,
            q_value,
            significant: q_value < alpha,
        })
        .collect();
    Ok(results)
}
