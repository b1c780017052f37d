//! Mann-Whitney U test (Wilcoxon rank-sum test).
//!
//! Non-parametric test of whether two independent samples come from the same
//! distribution. The p-value is two-sided.
//!
//! # Method selection
//!
//! - **Exact**: used when neither sample contains ties and the smaller
//!   sample has at most [`EXACT_MAX_SIZE`] observations, however large the
//!   other one is. The null distribution of U is expanded as a Gaussian
//!   binomial polynomial in `O(m * n)` memory.
//! - **Asymptotic**: normal approximation with tie correction and continuity
//!   correction otherwise.
//!
//! The reported statistic is U of the first sample: the number of
//! `(x, y)` pairs with `x > y`, ties counting one half.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::{StatsError, rank::average_ranks};

/// Largest size of the smaller sample for which the exact method is used.
pub const EXACT_MAX_SIZE: usize = 8;

const TEST_NAME: &str = "mann_whitney_u";

/// How the p-value of a [`MannWhitneyResult`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MannWhitneyMethod {
    Exact,
    Asymptotic,
}

#[derive(Debug, Clone)]
pub struct MannWhitneyResult {
    /// U statistic of the first sample.
    pub statistic: f64,
    /// Two-sided p-value in `[0, 1]`.
    pub p_value: f64,
    pub method: MannWhitneyMethod,
}

/// Runs a two-sided Mann-Whitney U test between `x` and `y`.
///
/// Both samples must be non-empty and free of NaN.
///
/// # Examples
///
/// ```
/// use ncp_stats::mann_whitney::{MannWhitneyMethod, mann_whitney_u};
///
/// let x = [0.0; 10];
/// let y = [10.0; 10];
/// let result = mann_whitney_u(&x, &y).unwrap();
/// assert_eq!(result.method, MannWhitneyMethod::Asymptotic);
/// assert!(result.p_value < 1e-4);
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<MannWhitneyResult, StatsError> {
    if x.is_empty() {
        return Err(StatsError::EmptySample {
            test: TEST_NAME,
            sample: "x",
        });
    }
    if y.is_empty() {
        return Err(StatsError::EmptySample {
            test: TEST_NAME,
            sample: "y",
        });
    }
    if let Some((index, &value)) = x.iter().chain(y).enumerate().find(|(_, v)| v.is_nan()) {
        return Err(StatsError::NonFinite {
            test: TEST_NAME,
            index,
            value,
        });
    }

    let n1 = x.len();
    let n2 = y.len();
    let combined = x.iter().chain(y).copied().collect::<Vec<_>>();
    let ranking = average_ranks(&combined);

    let r1 = ranking.ranks[..n1].iter().sum::<f64>();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u_max = u1.max(u2);

    if !ranking.has_ties() && n1.min(n2) <= EXACT_MAX_SIZE {
        // without ties U is integral
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tail = exact_upper_tail(n1, n2, u_max.round() as usize);
        return Ok(MannWhitneyResult {
            statistic: u1,
            p_value: (2.0 * tail).clamp(0.0, 1.0),
            method: MannWhitneyMethod::Exact,
        });
    }

    let n = (n1 + n2) as f64;
    let mu = (n1 * n2) as f64 / 2.0;
    let variance = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - ranking.tie_term() / (n * (n - 1.0)));
    let p_value = if variance > 0.0 {
        let z = (u_max - mu - 0.5) / variance.sqrt();
        (2.0 * Normal::standard().sf(z)).clamp(0.0, 1.0)
    } else {
        // every pooled observation is identical
        1.0
    };

    Ok(MannWhitneyResult {
        statistic: u1,
        p_value,
        method: MannWhitneyMethod::Asymptotic,
    })
}

/// Returns `P(U >= u)` under the null for samples of sizes `m` and `n`.
///
/// The counts of U are the coefficients of the Gaussian binomial
/// `prod_{i=1..=m} (1 - q^(n+i)) / (1 - q^i)` with `m <= n`, built one factor
/// at a time in a single vector of length `m * n + 1`.
fn exact_upper_tail(m: usize, n: usize, u: usize) -> f64 {
    let (m, n) = if m <= n { (m, n) } else { (n, m) };

    let mut counts = vec![0.0_f64; m * n + 1];
    counts[0] = 1.0;
    for i in 1..=m {
        let degree = i * n;
        // divide by (1 - q^i)
        for k in i..=degree {
            counts[k] += counts[k - i];
        }
        // multiply by (1 - q^(n + i))
        for k in (n + i..=degree).rev() {
            counts[k] -= counts[k - n - i];
        }
    }

    let total = counts.iter().sum::<f64>();
    let tail = counts.iter().skip(u).sum::<f64>();
    (tail / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn test_exact_fully_separated() {
        let result = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(result.method, MannWhitneyMethod::Exact);
        assert_eq!(result.statistic, 0.0);
        // 2 * 1 / C(6, 3)
        assert!((result.p_value - 0.1).abs() < TOL);
    }

    #[test]
    fn test_exact_is_symmetric() {
        let a = mann_whitney_u(&[1.0, 4.0, 6.0], &[2.0, 3.0, 5.0, 7.0]).unwrap();
        let b = mann_whitney_u(&[2.0, 3.0, 5.0, 7.0], &[1.0, 4.0, 6.0]).unwrap();
        assert!((a.p_value - b.p_value).abs() < TOL);
        assert!((a.statistic + b.statistic - 12.0).abs() < TOL);
    }

    #[test]
    fn test_exact_tail_sums_to_one() {
        assert!((exact_upper_tail(4, 5, 0) - 1.0).abs() < TOL);
        assert!((exact_upper_tail(2, 2, 4) - 1.0 / 6.0).abs() < TOL);
    }

    #[test]
    fn test_exact_tail_small_sizes() {
        // sizes (3, 3): counts of U = 0..=9 are 1 1 2 3 3 3 3 2 1 1
        let counts = [1.0, 1.0, 2.0, 3.0, 3.0, 3.0, 3.0, 2.0, 1.0, 1.0];
        for u in 0..=9 {
            let expected = counts[u..].iter().sum::<f64>() / 20.0;
            let p = exact_upper_tail(3, 3, u);
            assert!((p - expected).abs() < TOL, "u = {u}");
        }
        assert!((exact_upper_tail(5, 4, 20) - 1.0 / 126.0).abs() < TOL);
    }

    #[test]
    fn test_exact_with_large_second_sample() {
        let x = (0..8)
            .map(|i| f64::from(i) * 500.0 + 1750.5)
            .collect::<Vec<_>>();
        let y = (0..5000).map(f64::from).collect::<Vec<_>>();
        let result = mann_whitney_u(&x, &y).unwrap();
        assert_eq!(result.method, MannWhitneyMethod::Exact);

        let (n1, n2) = (8.0, 5000.0);
        let u_max = result.statistic.max(n1 * n2 - result.statistic);
        let sigma = (n1 * n2 * (n1 + n2 + 1.0) / 12.0_f64).sqrt();
        let z = (u_max - n1 * n2 / 2.0 - 0.5) / sigma;
        let asymptotic = 2.0 * Normal::standard().sf(z);
        assert!(
            (result.p_value - asymptotic).abs() < 5e-3,
            "exact {} vs asymptotic {asymptotic}",
            result.p_value
        );
    }

    #[test]
    fn test_asymptotic_with_ties() {
        // constant groups: tie-corrected sigma, continuity corrected
        let result = mann_whitney_u(&[0.0; 10], &[10.0; 10]).unwrap();
        assert_eq!(result.method, MannWhitneyMethod::Asymptotic);
        assert_eq!(result.statistic, 0.0);
        let sigma = (100.0_f64 / 12.0 * (21.0 - 1980.0 / 380.0)).sqrt();
        let z = (100.0 - 50.0 - 0.5) / sigma;
        let expected = 2.0 * Normal::standard().sf(z);
        assert!((result.p_value - expected).abs() < TOL);
        assert!(result.p_value < 1e-4);
    }

    #[test]
    fn test_identical_samples() {
        let result = mann_whitney_u(&[1.0, 1.0, 1.0], &[1.0, 1.0]).unwrap();
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_empty_sample_is_error() {
        assert!(matches!(
            mann_whitney_u(&[], &[1.0]),
            Err(StatsError::EmptySample { sample: "x", .. })
        ));
        assert!(mann_whitney_u(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_nan_is_error() {
        assert!(matches!(
            mann_whitney_u(&[1.0, f64::NAN], &[2.0]),
            Err(StatsError::NonFinite { index: 1, .. })
        ));
    }
}
