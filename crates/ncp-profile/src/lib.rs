//! Profile tables for morphological profiling analyses.
//!
//! A profile is one row of a table: a fixed-length feature vector plus a set
//! of metadata attributes (group identifier, cell type, condition, ...).
//! This crate turns raw tabular input into a [`ProfileTable`] by applying an
//! explicit [`TableConfig`](config::TableConfig) once, at load time:
//!
//! 1. **Drop** unwanted columns (exact names or prefixes)
//! 2. **Rename** columns
//! 3. **Add** constant columns and **compute** derived columns
//! 4. **Concatenate** several sources, checking that their columns match
//! 5. **Filter** rows by metadata values
//! 6. **Split** the columns into metadata and features, optionally
//!    subsampling the features with a seeded generator
//!
//! Downstream crates only ever see a [`ProfileTable`], whose rows are always
//! numbered `0..n` without gaps. Row position is the identity every pair and
//! rank structure refers to, so every operation that removes or reorders
//! rows returns a freshly indexed table.
//!
//! # Example
//!
//! ```
//! use ncp_profile::{config::TableConfig, raw::RawTable};
//!
//! let raw: RawTable = serde_json::from_str(
//!     r#"{
//!         "columns": ["Metadata_line_ID", "Cells_Area", "Nuclei_Area"],
//!         "rows": [["a", 1.0, 2.0], ["b", 3.0, null]]
//!     }"#,
//! )
//! .unwrap();
//!
//! let mut config = TableConfig::default();
//! config.features.prefixes = vec!["Cells_".into(), "Nuclei_".into()];
//! let table = config.load(vec![raw]).unwrap();
//!
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.features.names(), ["Cells_Area", "Nuclei_Area"]);
//! assert!(table.features.get(1, 1).is_nan());
//! ```

pub use self::table::{FeatureMatrix, Metadata, ProfileTable};

pub mod config;
pub mod raw;
pub mod schema;
pub mod table;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ProfileError {
    #[display("column '{column}' required by {operation} does not exist")]
    UnknownColumn {
        column: String,
        operation: &'static str,
    },
    #[display("column '{column}' appears more than once")]
    DuplicateColumn { column: String },
    #[display("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[display("feature column '{column}' has a non-numeric value at row {row}")]
    NonNumericFeature { column: String, row: usize },
    #[display("metadata has {metadata} rows but features have {features}")]
    RowCountMismatch { metadata: usize, features: usize },
    #[display("feature matrix of {rows}x{columns} cannot hold {values} values")]
    ShapeMismatch {
        rows: usize,
        columns: usize,
        values: usize,
    },
    #[display("no feature columns selected")]
    NoFeatureColumns,
    #[display("no input tables")]
    NoTables,
    #[display("{report}")]
    SchemaMismatch { report: schema::SchemaReport },
}
