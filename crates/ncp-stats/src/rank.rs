//! Average ranking of samples.
//!
//! Tied values share the mean of the ranks they span (the "average" method).
//! Ranks are 1-based.

/// Ranks of a sample together with the sizes of its tie groups.
#[derive(Debug, Clone)]
pub struct Ranking {
    /// 1-based average rank of each input value, in input order.
    pub ranks: Vec<f64>,
    /// Size of every group of tied values (including singleton groups).
    pub tie_sizes: Vec<usize>,
}

impl Ranking {
    /// Returns `true` if at least two values compare equal.
    #[must_use]
    pub fn has_ties(&self) -> bool {
        self.tie_sizes.iter().any(|&t| t > 1)
    }

    /// Returns `Σ (t³ - t)` over tie groups, the term used by tie corrections.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn tie_term(&self) -> f64 {
        self.tie_sizes
            .iter()
            .map(|&t| {
                let t = t as f64;
                t * t * t - t
            })
            .sum()
    }
}

/// Computes average ranks of `values`.
///
/// Values are ordered with [`f64::total_cmp`]; callers are expected to have
/// removed NaNs beforehand.
///
/// # Examples
///
/// ```
/// use ncp_stats::rank::average_ranks;
///
/// let ranking = average_ranks(&[10.0, 20.0, 10.0, 30.0]);
/// assert_eq!(ranking.ranks, vec![1.5, 3.0, 1.5, 4.0]);
/// assert!(ranking.has_ties());
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn average_ranks(values: &[f64]) -> Ranking {
    let n = values.len();
    let mut order = (0..n).collect::<Vec<_>>();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut tie_sizes = vec![];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share ranks (start + 1)..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        tie_sizes.push(end - start);
        start = end;
    }

    Ranking { ranks, tie_sizes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ties() {
        let ranking = average_ranks(&[3.0, 1.0, 2.0]);
        assert_eq!(ranking.ranks, vec![3.0, 1.0, 2.0]);
        assert!(!ranking.has_ties());
        assert_eq!(ranking.tie_term(), 0.0);
    }

    #[test]
    fn test_all_tied() {
        let ranking = average_ranks(&[5.0; 4]);
        assert_eq!(ranking.ranks, vec![2.5; 4]);
        assert_eq!(ranking.tie_sizes, vec![4]);
        assert_eq!(ranking.tie_term(), 60.0);
    }

    #[test]
    fn test_empty() {
        let ranking = average_ranks(&[]);
        assert!(ranking.ranks.is_empty());
        assert!(ranking.tie_sizes.is_empty());
    }
}
