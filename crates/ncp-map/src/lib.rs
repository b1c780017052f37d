//! Retrieval-style significance testing of profiles.
//!
//! This crate answers the question "are profiles that should look alike
//! actually closer to each other than profiles that should not?" by ranking
//! pairs of profiles by cosine similarity and scoring every profile with the
//! average precision (AP) of its positive pairs among its negative pairs.
//! Significance comes from a permutation null model that is shared by all
//! queries with the same number of positive and negative candidates.
//!
//! # Pipeline
//!
//! ```text
//! metadata ──► Matcher ──► PairSet (positive / negative)
//!                             │
//! features ──► pairwise_cosine ──► similarities
//!                             │
//!              build_rank_lists ──► RankLists (relevance + signatures)
//!                             │
//!                   compute_ap ──► AP per query
//!                             │
//!              compute_p_values ──► p-value per query (cached nulls)
//! ```
//!
//! [`pipeline::run_pipeline`] drives all stages and joins the scores back
//! onto the metadata rows.
//!
//! # Modules
//!
//! - [`matcher`]: same-group / different-group pair enumeration
//! - [`similarity`]: batched cosine similarity of index pairs
//! - [`rank_list`]: per-query ranked relevance sequences
//! - [`average_precision`]: AP scoring
//! - [`null_model`]: permutation null distributions and p-values
//! - [`pipeline`]: end-to-end driver

use serde::{Deserialize, Serialize};

pub mod average_precision;
pub mod matcher;
pub mod null_model;
pub mod pipeline;
pub mod rank_list;
pub mod similarity;

/// An unordered pair of row indices, stored with the smaller index first.
pub type Pair = (usize, usize);

/// Shape of a query's candidate list: how many positives and negatives it ranks.
///
/// Queries sharing a signature share the same null distribution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Signature {
    pub n_pos: usize,
    pub n_neg: usize,
}

impl Signature {
    #[must_use]
    pub fn new(n_pos: usize, n_neg: usize) -> Self {
        Self { n_pos, n_neg }
    }

    #[must_use]
    pub fn total(self) -> usize {
        self.n_pos + self.n_neg
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum MapError {
    #[display("column '{column}' required by {operation} does not exist")]
    UnknownColumn {
        column: String,
        operation: &'static str,
    },
    #[display("batch size must be positive")]
    EmptyBatch,
    #[display("null size must be positive")]
    EmptyNull,
    #[display("{what}: expected {expected} entries, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[display("pair ({}, {}) refers to a row outside 0..{n_rows}", pair.0, pair.1)]
    PairOutOfBounds { pair: Pair, n_rows: usize },
    #[display("feature '{column}' of row {row} is not finite")]
    NonFiniteFeature { row: usize, column: String },
}
