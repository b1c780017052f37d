//! Permutation null model for average precision.
//!
//! Under the null hypothesis the `n_pos` positives of a query are spread
//! uniformly at random over the `n_pos + n_neg` ranks of its list. The null
//! distribution therefore only depends on the query's [`Signature`], and one
//! distribution is generated per distinct signature and shared by every
//! query that has it.
//!
//! Generation is deterministic: the random stream of a signature is seeded
//! from the run seed and the signature itself, so results do not depend on
//! which thread generates a distribution or in which order.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc, OnceLock, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use rand::{SeedableRng as _, seq::index};
use rand_pcg::Pcg64;
use rayon::prelude::*;

use crate::{MapError, Signature, average_precision::ap_from_ranks};

/// Sorted sample of null average precision scores for one signature.
#[derive(Debug, Clone, PartialEq)]
pub struct NullDistribution {
    scores: Vec<f64>,
}

impl NullDistribution {
    /// Draws `null_size` random rankings for `signature`.
    ///
    /// # Panics
    ///
    /// Panics if `signature.n_pos` is zero.
    #[must_use]
    pub fn sample(signature: Signature, null_size: usize, seed: u64) -> Self {
        assert!(signature.n_pos > 0, "null distribution needs a positive");
        let mut rng = Pcg64::seed_from_u64(signature_seed(seed, signature));
        let mut scores = (0..null_size)
            .map(|_| {
                let mut positions =
                    index::sample(&mut rng, signature.total(), signature.n_pos).into_vec();
                positions.sort_unstable();
                ap_from_ranks(positions.into_iter().map(|p| p + 1), signature.n_pos)
            })
            .collect::<Vec<_>>();
        scores.sort_unstable_by(f64::total_cmp);
        Self { scores }
    }

    /// Null scores in ascending order.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Permutation p-value of an observed score: `(k + 1) / (n + 1)`, where
    /// `k` counts null scores at least as large as `observed`.
    ///
    /// Never zero and never above one.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn p_value(&self, observed: f64) -> f64 {
        let below = self.scores.partition_point(|&s| s < observed);
        let at_least = self.scores.len() - below;
        (at_least + 1) as f64 / (self.scores.len() + 1) as f64
    }
}

/// Mixes the run seed with a signature into an independent stream seed.
fn signature_seed(seed: u64, signature: Signature) -> u64 {
    fn splitmix64(mut z: u64) -> u64 {
        z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
    let n_pos = signature.n_pos as u64;
    let n_neg = signature.n_neg as u64;
    splitmix64(splitmix64(splitmix64(seed) ^ n_pos) ^ n_neg)
}

/// Null distributions shared across queries and threads.
///
/// Each signature's distribution is generated at most once, even when many
/// threads ask for it at the same time.
#[derive(Debug)]
pub struct NullDistributionCache {
    null_size: usize,
    seed: u64,
    entries: RwLock<HashMap<Signature, Arc<OnceLock<Arc<NullDistribution>>>>>,
    generated: AtomicUsize,
}

impl NullDistributionCache {
    /// # Errors
    ///
    /// Returns [`MapError::EmptyNull`] if `null_size` is zero.
    pub fn new(null_size: usize, seed: u64) -> Result<Self, MapError> {
        if null_size == 0 {
            return Err(MapError::EmptyNull);
        }
        Ok(Self {
            null_size,
            seed,
            entries: RwLock::default(),
            generated: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn null_size(&self) -> usize {
        self.null_size
    }

    /// Number of distributions generated so far.
    #[must_use]
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::Relaxed)
    }

    /// Returns the distribution of `signature`, generating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `signature.n_pos` is zero.
    pub fn get_or_compute(&self, signature: Signature) -> Arc<NullDistribution> {
        let slot = self.slot(signature);
        let distribution = slot.get_or_init(|| {
            self.generated.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                n_pos = signature.n_pos,
                n_neg = signature.n_neg,
                "sampling null distribution"
            );
            Arc::new(NullDistribution::sample(signature, self.null_size, self.seed))
        });
        Arc::clone(distribution)
    }

    fn slot(&self, signature: Signature) -> Arc<OnceLock<Arc<NullDistribution>>> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = entries.get(&signature) {
                return Arc::clone(slot);
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(signature).or_default())
    }
}

/// Computes the p-value of every scored query.
///
/// Queries whose score is `None` (no positive) get `None`.
///
/// # Errors
///
/// - [`MapError::EmptyNull`] if `null_size` is zero
/// - [`MapError::LengthMismatch`] if `ap_scores` and `signatures` differ in length
pub fn compute_p_values(
    ap_scores: &[Option<f64>],
    signatures: &[Signature],
    null_size: usize,
    seed: u64,
) -> Result<Vec<Option<f64>>, MapError> {
    let cache = NullDistributionCache::new(null_size, seed)?;
    compute_p_values_with(&cache, ap_scores, signatures)
}

/// Like [`compute_p_values`], but draws null distributions from `cache`.
///
/// # Errors
///
/// Returns [`MapError::LengthMismatch`] if `ap_scores` and `signatures`
/// differ in length.
pub fn compute_p_values_with(
    cache: &NullDistributionCache,
    ap_scores: &[Option<f64>],
    signatures: &[Signature],
) -> Result<Vec<Option<f64>>, MapError> {
    if ap_scores.len() != signatures.len() {
        return Err(MapError::LengthMismatch {
            what: "signatures",
            expected: ap_scores.len(),
            found: signatures.len(),
        });
    }

    let distinct = ap_scores
        .iter()
        .zip(signatures)
        .filter(|(score, signature)| score.is_some() && signature.n_pos > 0)
        .map(|(_, &signature)| signature)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    tracing::info!(
        signatures = distinct.len(),
        null_size = cache.null_size(),
        "computing null distributions"
    );
    distinct.par_iter().for_each(|&signature| {
        cache.get_or_compute(signature);
    });

    let p_values = ap_scores
        .iter()
        .zip(signatures)
        .map(|(score, &signature)| {
            let score = (*score)?;
            (signature.n_pos > 0).then(|| cache.get_or_compute(signature).p_value(score))
        })
        .collect();
    Ok(p_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_distribution() {
        let signature = Signature::new(2, 2);
        let a = NullDistribution::sample(signature, 999, 0);
        let b = NullDistribution::sample(signature, 999, 0);
        assert_eq!(a, b);
        assert_eq!(a.scores().len(), 999);
        assert!(a.scores().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_seed_and_signature_change_stream() {
        let a = NullDistribution::sample(Signature::new(3, 20), 200, 0);
        let b = NullDistribution::sample(Signature::new(3, 20), 200, 1);
        assert_ne!(a.scores(), b.scores());
        assert_ne!(
            signature_seed(0, Signature::new(2, 3)),
            signature_seed(0, Signature::new(3, 2))
        );
    }

    #[test]
    fn test_null_scores_in_range() {
        let null = NullDistribution::sample(Signature::new(3, 10), 500, 7);
        // the lowest reachable score puts all positives last
        let min = (1.0 / 11.0 + 2.0 / 12.0 + 3.0 / 13.0) / 3.0;
        assert!(null.scores().iter().all(|&s| s >= min - 1e-12 && s <= 1.0));
    }

    #[test]
    fn test_no_negatives_gives_perfect_null() {
        let null = NullDistribution::sample(Signature::new(3, 0), 10, 0);
        assert!(null.scores().iter().all(|&s| s == 1.0));
        assert_eq!(null.p_value(1.0), 1.0);
    }

    #[test]
    fn test_p_value_bounds() {
        let null = NullDistribution::sample(Signature::new(1, 9), 999, 3);
        assert_eq!(null.p_value(1.0 + 1e-9), 1.0 / 1000.0);
        assert_eq!(null.p_value(0.0), 1.0);
        let p = null.p_value(0.5);
        assert!(p > 0.0 && p <= 1.0);
    }

    #[test]
    fn test_p_value_of_perfect_score_is_small() {
        // one positive among 50: P(rank 1) = 1/50
        let null = NullDistribution::sample(Signature::new(1, 49), 2000, 11);
        let p = null.p_value(1.0);
        assert!(p < 0.05, "p = {p}");
    }

    #[test]
    fn test_cache_generates_each_signature_once() {
        let cache = NullDistributionCache::new(100, 0).unwrap();
        let signature = Signature::new(2, 5);
        (0..64).into_par_iter().for_each(|_| {
            cache.get_or_compute(signature);
        });
        assert_eq!(cache.generated(), 1);
        let a = cache.get_or_compute(signature);
        let b = cache.get_or_compute(signature);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_compute_p_values_shares_nulls() {
        let scores = [Some(1.0), None, Some(0.5), Some(0.5), Some(1.0)];
        let signatures = [
            Signature::new(1, 3),
            Signature::new(0, 4),
            Signature::new(1, 3),
            Signature::new(2, 2),
            Signature::new(2, 2),
        ];
        let cache = NullDistributionCache::new(999, 0).unwrap();
        let p = compute_p_values_with(&cache, &scores, &signatures).unwrap();
        assert_eq!(cache.generated(), 2);
        assert_eq!(p[1], None);
        assert!(p.iter().flatten().all(|&p| p > 0.0 && p <= 1.0));

        let again = compute_p_values(&scores, &signatures, 999, 0).unwrap();
        assert_eq!(p, again);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            compute_p_values(&[Some(1.0)], &[Signature::new(1, 1)], 0, 0),
            Err(MapError::EmptyNull)
        ));
        assert!(matches!(
            compute_p_values(&[Some(1.0)], &[], 10, 0),
            Err(MapError::LengthMismatch { .. })
        ));
    }
}
