//! Cosine similarity of profile pairs.

use ncp_profile::FeatureMatrix;
use rayon::prelude::*;

use crate::{MapError, Pair};

/// Default number of pairs processed per parallel batch.
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

/// Cosine similarity of two vectors; `0.0` if either has zero norm.
#[must_use]
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    scaled_dot(a, b, norm(a) * norm(b))
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn scaled_dot(a: &[f64], b: &[f64], denom: f64) -> f64 {
    if denom == 0.0 {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>() / denom
}

/// Computes the cosine similarity of every pair, in input order.
///
/// Pairs are processed in batches of `batch_size`; batches run in parallel
/// and the result does not depend on the batch size.
///
/// # Errors
///
/// - [`MapError::EmptyBatch`] if `batch_size` is zero
/// - [`MapError::PairOutOfBounds`] if a pair refers to a missing row
/// - [`MapError::NonFiniteFeature`] if a referenced row has a NaN or infinite value
pub fn pairwise_cosine(
    features: &FeatureMatrix,
    pairs: &[Pair],
    batch_size: usize,
) -> Result<Vec<f64>, MapError> {
    if batch_size == 0 {
        return Err(MapError::EmptyBatch);
    }
    let n_rows = features.n_rows();
    if let Some(&pair) = pairs.iter().find(|(i, j)| *i >= n_rows || *j >= n_rows) {
        return Err(MapError::PairOutOfBounds { pair, n_rows });
    }

    let mut used = vec![false; n_rows];
    for &(i, j) in pairs {
        used[i] = true;
        used[j] = true;
    }
    for (row, values) in features.rows().enumerate().filter(|(row, _)| used[*row]) {
        if let Some(col) = values.iter().position(|v| !v.is_finite()) {
            return Err(MapError::NonFiniteFeature {
                row,
                column: features.names()[col].clone(),
            });
        }
    }

    let norms = features.rows().map(norm).collect::<Vec<_>>();
    let similarities = pairs
        .par_chunks(batch_size)
        .flat_map_iter(|batch| {
            batch
                .iter()
                .map(|&(i, j)| scaled_dot(features.row(i), features.row(j), norms[i] * norms[j]))
        })
        .collect();
    Ok(similarities)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn matrix(rows: &[Vec<f64>]) -> FeatureMatrix {
        let names = (0..rows[0].len()).map(|i| format!("f{i}")).collect();
        FeatureMatrix::from_rows(names, rows).unwrap()
    }

    #[test]
    fn test_cosine_values() {
        let features = matrix(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 0.0],
        ]);
        let sims = pairwise_cosine(&features, &[(0, 1), (0, 2), (0, 3), (0, 4)], 2).unwrap();
        assert!(sims[0].abs() < TOL);
        assert!((sims[1] - 1.0).abs() < TOL);
        assert!((sims[2] + 1.0).abs() < TOL);
        // zero vector
        assert_eq!(sims[3], 0.0);
    }

    #[test]
    fn test_batch_size_does_not_change_result() {
        let rows = (0..20)
            .map(|i| {
                let x = f64::from(i);
                vec![x.sin(), x.cos(), (x * 0.3).sin() + 0.1]
            })
            .collect::<Vec<_>>();
        let features = matrix(&rows);
        let pairs = (0..20)
            .flat_map(|i| (i + 1..20).map(move |j| (i, j)))
            .collect::<Vec<_>>();
        let one = pairwise_cosine(&features, &pairs, 1).unwrap();
        let seven = pairwise_cosine(&features, &pairs, 7).unwrap();
        let all = pairwise_cosine(&features, &pairs, pairs.len()).unwrap();
        assert_eq!(one, seven);
        assert_eq!(one, all);
        assert!(one.iter().all(|s| (-1.0 - TOL..=1.0 + TOL).contains(s)));
        let (i, j) = pairs[17];
        assert!((one[17] - cosine(features.row(i), features.row(j))).abs() < TOL);
    }

    #[test]
    fn test_errors() {
        let features = matrix(&[vec![1.0, f64::NAN], vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(
            pairwise_cosine(&features, &[(1, 2)], 0),
            Err(MapError::EmptyBatch)
        );
        assert_eq!(
            pairwise_cosine(&features, &[(1, 3)], 10),
            Err(MapError::PairOutOfBounds {
                pair: (1, 3),
                n_rows: 3,
            })
        );
        assert_eq!(
            pairwise_cosine(&features, &[(0, 1)], 10),
            Err(MapError::NonFiniteFeature {
                row: 0,
                column: "f1".into(),
            })
        );
        // rows outside every pair may hold NaN
        assert!(pairwise_cosine(&features, &[(1, 2)], 10).is_ok());
    }

    #[test]
    fn test_empty_pairs() {
        let features = matrix(&[vec![1.0]]);
        assert!(pairwise_cosine(&features, &[], 5).unwrap().is_empty());
    }
}
