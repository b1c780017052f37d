//! Per-category classification and feature testing.

use std::{
    collections::{BTreeMap, BTreeSet},
    thread,
};

use chrono::Utc;
use ncp_classify::{
    Target, cross_validate::cross_validate, logistic::LogisticRegression, split::Splitter,
    univariate::mann_whitney_u_test,
};
use ncp_profile::ProfileTable;
use ncp_stats::correction::DEFAULT_ALPHA;
use serde::{Deserialize, Serialize};

use crate::{
    AnalysisError,
    report::{AnalysisReport, CategoryResult},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Metadata column whose distinct values are analysed separately.
    pub category_col: String,
    /// Metadata column holding the class labels.
    pub target_col: String,
    /// Class (0 or 1) of every target label; rows with other labels are dropped.
    pub target_mapping: BTreeMap<String, i64>,
    /// Metadata column whose groups never straddle a train/test split.
    #[serde(default = "default_group_col")]
    pub group_col: String,
    /// Features to analyse; empty means every feature of the table.
    #[serde(default)]
    pub feature_cols: Vec<String>,
    #[serde(default)]
    pub splitter: Splitter,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_group_col() -> String {
    "Metadata_line_ID".to_owned()
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

impl AnalysisConfig {
    /// Name of the metadata column holding the encoded classes.
    #[must_use]
    pub fn encoded_target_col(&self) -> String {
        format!("{}_encoded", self.target_col)
    }
}

/// Runs classification and univariate testing for every category of `table`.
///
/// Categories are analysed in parallel and reported in order of first
/// appearance.
///
/// # Errors
///
/// - [`AnalysisError::Profile`] if a configured column does not exist
/// - [`AnalysisError::NoMappedRows`] if no row has a mapped target label
/// - [`AnalysisError::Category`] if a category fails a statistical precondition
pub fn perform_analysis(
    table: &ProfileTable,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    const OPERATION: &str = "analysis";
    let categories = table.metadata.require(&config.category_col, OPERATION)?;
    table.metadata.require(&config.group_col, OPERATION)?;
    let feature_cols = if config.feature_cols.is_empty() {
        table.features.names().to_vec()
    } else {
        table.features.select_columns(&config.feature_cols)?;
        config.feature_cols.clone()
    };

    let encoded = table
        .metadata
        .require(&config.target_col, OPERATION)?
        .iter()
        .map(|label| {
            label
                .as_ref()
                .and_then(|l| config.target_mapping.get(l).copied())
        })
        .collect::<Vec<_>>();
    let (table, dropped_rows) = encode_target(table, config, &encoded)?;

    let mut order = vec![];
    let mut seen = BTreeSet::new();
    for value in categories
        .iter()
        .zip(&encoded)
        .filter_map(|(c, e)| e.and(c.as_ref()))
    {
        if seen.insert(value) {
            order.push(value.clone());
        }
    }
    tracing::info!(
        categories = order.len(),
        rows = table.len(),
        "starting analysis"
    );

    let mut results = order.iter().map(|_| None).collect::<Vec<_>>();
    thread::scope(|s| {
        for (slot, category) in results.iter_mut().zip(&order) {
            let table = &table;
            let feature_cols = &feature_cols;
            s.spawn(move || {
                *slot = Some(analyze_category(table, config, feature_cols, category));
            });
        }
    });

    let categories = results
        .into_iter()
        .flatten()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AnalysisReport {
        generated_at: Utc::now(),
        dropped_rows,
        categories,
    })
}

/// Keeps the rows with a mapped target and appends the encoded class column.
fn encode_target(
    table: &ProfileTable,
    config: &AnalysisConfig,
    encoded: &[Option<i64>],
) -> Result<(ProfileTable, usize), AnalysisError> {
    let labels = table.metadata.require(&config.target_col, "analysis")?;
    let unmapped = labels
        .iter()
        .zip(encoded)
        .filter(|(_, e)| e.is_none())
        .map(|(l, _)| l.as_deref().unwrap_or("<missing>"))
        .collect::<BTreeSet<_>>();
    let kept = (0..table.len())
        .filter(|&row| encoded[row].is_some())
        .collect::<Vec<_>>();
    let dropped = table.len() - kept.len();
    if dropped > 0 {
        tracing::warn!(
            rows = dropped,
            column = %config.target_col,
            values = ?unmapped,
            "dropping rows with unmapped target labels"
        );
    }
    if kept.is_empty() {
        return Err(AnalysisError::NoMappedRows {
            target_col: config.target_col.clone(),
        });
    }

    let mut selected = table.select_rows(&kept);
    let classes = kept
        .iter()
        .map(|&row| encoded[row].map(|class| class.to_string()))
        .collect();
    selected
        .metadata
        .push_column(config.encoded_target_col(), classes)?;
    Ok((selected, dropped))
}

fn analyze_category(
    table: &ProfileTable,
    config: &AnalysisConfig,
    feature_cols: &[String],
    category: &str,
) -> Result<CategoryResult, AnalysisError> {
    let in_category = |error| AnalysisError::Category {
        category: category.to_owned(),
        source: error,
    };
    tracing::info!(category, "analyzing category");

    let subset = table.filter_by(&config.category_col, |v| v == Some(category))?;
    let target_col = config.encoded_target_col();
    let target = Target::from_labels(subset.metadata.require(&target_col, "analysis")?)
        .map_err(in_category)?;
    let groups = subset.metadata.require(&config.group_col, "analysis")?;
    let features = subset.features.select_columns(feature_cols)?;

    let classification = cross_validate(
        &features,
        &target,
        groups,
        &config.splitter,
        &LogisticRegression::default(),
    )
    .map_err(in_category)?;
    let tests = mann_whitney_u_test(&subset, feature_cols, &target_col, config.alpha)
        .map_err(in_category)?;

    let result = CategoryResult {
        category: category.to_owned(),
        n_rows: subset.len(),
        classification,
        tests,
    };
    tracing::debug!(
        category,
        accuracy = result.classification.mean_accuracy,
        significant = result.significant_features().len(),
        "category analyzed"
    );
    Ok(result)
}
