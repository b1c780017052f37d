//! Median imputation of missing feature values.

use ncp_profile::FeatureMatrix;
use ncp_stats::descriptive::nan_median;

/// Per-column medians learned from a set of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MedianImputer {
    medians: Vec<f64>,
}

impl MedianImputer {
    /// Learns the median of every column over `rows`, ignoring NaN.
    ///
    /// A column with no observed value in `rows` imputes `0.0`.
    #[must_use]
    pub fn fit(features: &FeatureMatrix, rows: &[usize]) -> Self {
        let medians = (0..features.n_cols())
            .map(|col| nan_median(rows.iter().map(|&r| features.get(r, col))).unwrap_or(0.0))
            .collect();
        Self { medians }
    }

    #[must_use]
    pub fn medians(&self) -> &[f64] {
        &self.medians
    }

    /// Returns `rows` with NaN replaced by the learned medians.
    #[must_use]
    pub fn transform(&self, features: &FeatureMatrix, rows: &[usize]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|&r| {
                features
                    .row(r)
                    .iter()
                    .zip(&self.medians)
                    .map(|(&v, &m)| if v.is_nan() { m } else { v })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> FeatureMatrix {
        FeatureMatrix::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            &[
                vec![1.0, f64::NAN, f64::NAN],
                vec![3.0, 10.0, f64::NAN],
                vec![f64::NAN, 20.0, f64::NAN],
                vec![100.0, 1000.0, 5.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_medians_ignore_nan() {
        let imputer = MedianImputer::fit(&matrix(), &[0, 1, 2]);
        assert_eq!(imputer.medians(), [2.0, 15.0, 0.0]);
    }

    #[test]
    fn test_fit_uses_only_given_rows() {
        let features = matrix();
        let imputer = MedianImputer::fit(&features, &[0, 1, 2]);
        // row 3 is held out and must not move the medians
        let filled = imputer.transform(&features, &[2, 3]);
        assert_eq!(filled[0], [2.0, 20.0, 0.0]);
        assert_eq!(filled[1], [100.0, 1000.0, 5.0]);
    }
}
