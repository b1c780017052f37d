//! Analysis outputs.
//!
//! ```text
//! AnalysisReport
//! ├─ generated_at, dropped_rows
//! ├─ categories: Vec<CategoryResult>
//! │   ├─ classification (cross-validated accuracy, feature weights)
//! │   └─ tests (per-feature U test, q-values)
//! └─ summary(): Vec<SummaryRow>   one flat row per category
//! ```

use chrono::{DateTime, Utc};
use ncp_classify::{cross_validate::CrossValidationResult, univariate::UTestResult};
use serde::Serialize;

/// Everything computed for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResult {
    pub category: String,
    pub n_rows: usize,
    pub classification: CrossValidationResult,
    pub tests: Vec<UTestResult>,
}

impl CategoryResult {
    /// Features whose U test is significant after correction, in test order.
    #[must_use]
    pub fn significant_features(&self) -> Vec<&str> {
        self.tests
            .iter()
            .filter(|t| t.significant)
            .map(|t| t.feature.as_str())
            .collect()
    }

    /// Name of the file the full test table of this category is written to.
    ///
    /// Characters other than ASCII letters, digits, `-`, `_` and `.` are
    /// replaced with `_`, so the name never leaves the output directory.
    #[must_use]
    pub fn test_results_file(&self) -> String {
        let category = self
            .category
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();
        format!("test_results_{category}.json")
    }

    #[must_use]
    pub fn summary(&self) -> SummaryRow {
        let significant = self.significant_features();
        SummaryRow {
            category: self.category.clone(),
            accuracy_mean: self.classification.mean_accuracy,
            accuracy_std: self.classification.std_accuracy,
            num_significant_features: significant.len(),
            significant_features: significant.join(","),
            full_test_results_file: self.test_results_file(),
        }
    }
}

/// One line of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub category: String,
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
    pub num_significant_features: usize,
    /// Comma-separated names of the significant features.
    pub significant_features: String,
    pub full_test_results_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    /// Rows left out because their target label has no mapping.
    pub dropped_rows: usize,
    pub categories: Vec<CategoryResult>,
}

impl AnalysisReport {
    #[must_use]
    pub fn summary(&self) -> Vec<SummaryRow> {
        self.categories
            .iter()
            .map(CategoryResult::summary)
            .collect()
    }
}
