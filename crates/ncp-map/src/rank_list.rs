//! Per-query ranked relevance sequences.
//!
//! Every pair is seen from both of its endpoints: pair `(i, j)` adds `j` to
//! the candidate list of query `i` and `i` to the list of query `j`. Each
//! query's candidates are ranked by decreasing similarity and reduced to a
//! relevance flag (positive or negative).

use crate::{MapError, Pair, Signature};

/// Concatenated rank lists of all queries that appear in at least one pair.
///
/// `queries[k]` owns the `counts[k].total()` flags of `relevance` that follow
/// the flags of the queries before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankLists {
    /// Query row indices in ascending order.
    pub queries: Vec<usize>,
    /// Relevance flags of all rank lists, best match first.
    pub relevance: Vec<bool>,
    pub counts: Vec<Signature>,
}

impl RankLists {
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Iterates over `(query, relevance, signature)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[bool], Signature)> + '_ {
        let mut offset = 0;
        self.queries
            .iter()
            .zip(&self.counts)
            .map(move |(&query, &signature)| {
                let list = &self.relevance[offset..offset + signature.total()];
                offset += signature.total();
                (query, list, signature)
            })
    }
}

struct Candidate {
    query: usize,
    similarity: f64,
    positive: bool,
}

/// Builds the rank list of every query from positive and negative pairs.
///
/// Candidates are ordered by decreasing similarity; on ties positives come
/// before negatives, and otherwise input order is kept.
///
/// # Errors
///
/// Returns [`MapError::LengthMismatch`] if a similarity vector does not have
/// one value per pair.
pub fn build_rank_lists(
    pos_pairs: &[Pair],
    neg_pairs: &[Pair],
    pos_sims: &[f64],
    neg_sims: &[f64],
) -> Result<RankLists, MapError> {
    if pos_pairs.len() != pos_sims.len() {
        return Err(MapError::LengthMismatch {
            what: "positive similarities",
            expected: pos_pairs.len(),
            found: pos_sims.len(),
        });
    }
    if neg_pairs.len() != neg_sims.len() {
        return Err(MapError::LengthMismatch {
            what: "negative similarities",
            expected: neg_pairs.len(),
            found: neg_sims.len(),
        });
    }

    let mut candidates = Vec::with_capacity(2 * (pos_pairs.len() + neg_pairs.len()));
    for (pairs, sims, positive) in [(pos_pairs, pos_sims, true), (neg_pairs, neg_sims, false)] {
        for (&(i, j), &similarity) in pairs.iter().zip(sims) {
            for query in [i, j] {
                candidates.push(Candidate {
                    query,
                    similarity,
                    positive,
                });
            }
        }
    }
    // stable: positives were pushed first and stay first on equal similarity
    candidates.sort_by(|a, b| {
        a.query
            .cmp(&b.query)
            .then(b.similarity.total_cmp(&a.similarity))
    });

    let mut lists = RankLists {
        relevance: Vec::with_capacity(candidates.len()),
        ..RankLists::default()
    };
    for candidate in &candidates {
        if lists.queries.last() != Some(&candidate.query) {
            lists.queries.push(candidate.query);
            lists.counts.push(Signature::default());
        }
        if let Some(signature) = lists.counts.last_mut() {
            if candidate.positive {
                signature.n_pos += 1;
            } else {
                signature.n_neg += 1;
            }
        }
        lists.relevance.push(candidate.positive);
    }
    Ok(lists)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_endpoints_are_queries() {
        let lists = build_rank_lists(&[(0, 1)], &[(0, 2), (1, 2)], &[0.9], &[0.5, 0.95]).unwrap();
        assert_eq!(lists.queries, [0, 1, 2]);
        assert_eq!(
            lists.counts,
            [
                Signature::new(1, 1),
                Signature::new(1, 1),
                Signature::new(0, 2),
            ]
        );
        let ranked = lists
            .iter()
            .map(|(q, r, _)| (q, r.to_vec()))
            .collect::<Vec<_>>();
        assert_eq!(
            ranked,
            [
                (0, vec![true, false]),
                // the negative 0.95 outranks the positive 0.9
                (1, vec![false, true]),
                (2, vec![false, false]),
            ]
        );
    }

    #[test]
    fn test_ties_rank_positives_first() {
        let lists = build_rank_lists(&[(0, 1)], &[(0, 2), (0, 3)], &[0.5], &[0.5, 0.7]).unwrap();
        let (query, relevance, signature) = lists.iter().next().unwrap();
        assert_eq!(query, 0);
        assert_eq!(relevance, [false, true, false]);
        assert_eq!(signature, Signature::new(1, 2));
    }

    #[test]
    fn test_counts_cover_relevance() {
        let lists = build_rank_lists(
            &[(0, 1), (2, 3), (1, 3)],
            &[(0, 2), (1, 2), (0, 3)],
            &[0.1, 0.2, 0.3],
            &[0.4, 0.5, 0.6],
        )
        .unwrap();
        let total = lists.counts.iter().map(|s| s.total()).sum::<usize>();
        assert_eq!(total, lists.relevance.len());
        assert_eq!(total, 12);
        for (_, relevance, signature) in lists.iter() {
            assert_eq!(relevance.iter().filter(|&&r| r).count(), signature.n_pos);
        }
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            build_rank_lists(&[(0, 1)], &[], &[], &[]),
            Err(MapError::LengthMismatch { .. })
        ));
    }
}
