//! Per-category analysis of profiling data.
//!
//! Profiles are split by a category column (e.g. cell type) and every
//! category is analysed independently:
//!
//! ```text
//! ProfileTable ──► encode target ──► split by category
//!                  (label → 0 / 1)        │
//!                                         ├─► cross-validated logistic regression
//!                                         └─► per-feature U tests + FDR
//!                                                   │
//!                                                   ▼
//!                                            AnalysisReport
//! ```
//!
//! Rows whose target label has no mapping are dropped before the split and
//! counted in [`report::AnalysisReport::dropped_rows`].
//!
//! # Example
//!
//! ```no_run
//! use ncp_analysis::orchestrator::{perform_analysis, AnalysisConfig};
//! # fn run(table: &ncp_profile::ProfileTable) -> Result<(), ncp_analysis::AnalysisError> {
//! let config: AnalysisConfig = serde_json::from_str(
//!     r#"{
//!         "category_col": "Metadata_cell_type",
//!         "target_col": "Metadata_status",
//!         "target_mapping": { "HC": 0, "PD": 1 }
//!     }"#,
//! )
//! .unwrap();
//! let report = perform_analysis(table, &config)?;
//! for row in report.summary() {
//!     println!("{}: {:.3}", row.category, row.accuracy_mean);
//! }
//! # Ok(())
//! # }
//! ```

use ncp_classify::ClassifyError;
use ncp_profile::ProfileError;

pub mod orchestrator;
pub mod report;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum AnalysisError {
    #[display("{_0}")]
    #[from]
    Profile(ProfileError),
    #[display("category '{category}': {source}")]
    Category {
        category: String,
        source: ClassifyError,
    },
    #[display("no row of '{target_col}' has a mapped target label")]
    NoMappedRows { target_col: String },
}
