//! Multiple testing correction.
//!
//! When many features are tested at once, raw p-values are converted into
//! Benjamini-Hochberg q-values that control the false discovery rate.

use crate::StatsError;

/// Default significance level for false discovery rate control.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Benjamini-Hochberg adjusted p-values with their rejection decisions.
#[derive(Debug, Clone)]
pub struct FdrCorrection {
    /// Adjusted p-values (q-values), in input order.
    pub q_values: Vec<f64>,
    /// `true` where the null hypothesis is rejected at `alpha` (`q <= alpha`).
    pub rejected: Vec<bool>,
    /// Significance level the decisions were made at.
    pub alpha: f64,
}

impl FdrCorrection {
    /// Applies the Benjamini-Hochberg procedure to `p_values`.
    ///
    /// p-values are sorted, scaled as `p * n / rank`, made monotone from the
    /// largest rank down, and clamped to 1. The result satisfies `q >= p`
    /// pointwise and is non-decreasing along sorted p-values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ncp_stats::correction::FdrCorrection;
    /// let fdr = FdrCorrection::benjamini_hochberg(&[0.01, 0.04, 0.03, 0.005], 0.05).unwrap();
    /// assert!((fdr.q_values[0] - 0.02).abs() < 1e-12);
    /// assert!((fdr.q_values[1] - 0.04).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn benjamini_hochberg(p_values: &[f64], alpha: f64) -> Result<Self, StatsError> {
        validate_p_values(p_values)?;
        let n = p_values.len();

        let mut order = (0..n).collect::<Vec<_>>();
        order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

        let n_f = n as f64;
        let mut q_values = vec![0.0; n];
        let mut prev = f64::INFINITY;
        for (i, &idx) in order.iter().enumerate().rev() {
            let rank = (i + 1) as f64;
            let q = (p_values[idx] * n_f / rank).min(1.0).min(prev);
            q_values[idx] = q;
            prev = q;
        }

        let rejected = q_values.iter().map(|&q| q <= alpha).collect();
        Ok(Self {
            q_values,
            rejected,
            alpha,
        })
    }
}

fn validate_p_values(p_values: &[f64]) -> Result<(), StatsError> {
    for (index, &value) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(StatsError::InvalidPValue { index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn test_known_values() {
        // sorted: 0.005, 0.01, 0.03, 0.04 -> 0.02, 0.02, 0.04, 0.04
        let fdr = FdrCorrection::benjamini_hochberg(&[0.01, 0.04, 0.03, 0.005], DEFAULT_ALPHA)
            .unwrap();
        let expected = [0.02, 0.04, 0.04, 0.02];
        for (q, e) in fdr.q_values.iter().zip(expected) {
            assert!((q - e).abs() < TOL);
        }
        assert_eq!(fdr.rejected, vec![true, true, true, true]);
    }

    #[test]
    fn test_monotone_and_dominates_p() {
        let p = [0.1, 0.001, 0.05, 0.01, 0.5, 0.049, 0.2];
        let fdr = FdrCorrection::benjamini_hochberg(&p, DEFAULT_ALPHA).unwrap();
        let mut pairs = p
            .iter()
            .copied()
            .zip(fdr.q_values.iter().copied())
            .collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (p, q) in &pairs {
            assert!(q >= p);
            assert!(*q <= 1.0);
        }
        for w in pairs.windows(2) {
            assert!(w[1].1 >= w[0].1);
        }
    }

    #[test]
    fn test_reproducible() {
        let p = [0.3, 0.02, 0.02, 0.9];
        let a = FdrCorrection::benjamini_hochberg(&p, DEFAULT_ALPHA).unwrap();
        let b = FdrCorrection::benjamini_hochberg(&p, DEFAULT_ALPHA).unwrap();
        assert_eq!(a.q_values, b.q_values);
    }

    #[test]
    fn test_empty_and_single() {
        let fdr = FdrCorrection::benjamini_hochberg(&[], DEFAULT_ALPHA).unwrap();
        assert!(fdr.q_values.is_empty());
        let fdr = FdrCorrection::benjamini_hochberg(&[0.07], DEFAULT_ALPHA).unwrap();
        assert!((fdr.q_values[0] - 0.07).abs() < TOL);
        assert_eq!(fdr.rejected, vec![false]);
    }

    #[test]
    fn test_invalid_p_value() {
        assert!(matches!(
            FdrCorrection::benjamini_hochberg(&[0.5, 1.5], DEFAULT_ALPHA),
            Err(StatsError::InvalidPValue { index: 1, .. })
        ));
        assert!(FdrCorrection::benjamini_hochberg(&[f64::NAN], DEFAULT_ALPHA).is_err());
    }
}
