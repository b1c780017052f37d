//! Statistical utilities shared by the profile analysis crates.
//!
//! This crate provides the small statistical toolbox the rest of the
//! workspace builds on:
//!
//! - **Descriptive statistics**: mean, median, variance, standard deviation
//! - **Ranking**: average ranks with tie bookkeeping
//! - **Mann-Whitney U test**: two-sided rank-sum test (exact or asymptotic)
//! - **Multiple testing correction**: Benjamini-Hochberg false discovery rate
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`rank`]: Average ranking of samples with ties
//! - [`mann_whitney`]: Wilcoxon rank-sum / Mann-Whitney U test
//! - [`correction`]: Benjamini-Hochberg q-values
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use ncp_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.median, 3.0);
//! ```
//!
//! ## Testing two samples
//!
//! ```
//! use ncp_stats::mann_whitney::mann_whitney_u;
//!
//! let control = [1.0, 2.0, 3.0];
//! let treated = [4.0, 5.0, 6.0];
//! let result = mann_whitney_u(&control, &treated).unwrap();
//! assert_eq!(result.statistic, 0.0);
//! assert!((result.p_value - 0.1).abs() < 1e-12);
//! ```
//!
//! ## Correcting p-values
//!
//! ```
//! use ncp_stats::correction::FdrCorrection;
//!
//! let correction = FdrCorrection::benjamini_hochberg(&[0.01, 0.04, 0.03, 0.005], 0.05).unwrap();
//! assert!(correction.rejected.iter().all(|r| *r));
//! ```

pub mod correction;
pub mod descriptive;
pub mod mann_whitney;
pub mod rank;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum StatsError {
    #[display("{test}: sample '{sample}' has no observations")]
    EmptySample {
        test: &'static str,
        sample: &'static str,
    },
    #[display("{test}: non-finite value {value} at index {index}")]
    NonFinite {
        test: &'static str,
        index: usize,
        value: f64,
    },
    #[display("p-value at index {index} is out of range [0, 1]: {value}")]
    InvalidPValue { index: usize, value: f64 },
}
