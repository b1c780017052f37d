//! Average precision of ranked relevance sequences.

use crate::{MapError, Signature};

/// Average precision of positives found at the given 1-based ranks.
///
/// `ranks` must be increasing. Observed and null scores both go through this
/// function, so equal rankings give bit-identical scores.
#[expect(clippy::cast_precision_loss)]
pub(crate) fn ap_from_ranks<I>(ranks: I, n_pos: usize) -> f64
where
    I: IntoIterator<Item = usize>,
{
    let sum = ranks
        .into_iter()
        .enumerate()
        .map(|(hit, rank)| (hit + 1) as f64 / rank as f64)
        .sum::<f64>();
    sum / n_pos as f64
}

/// Average precision of one rank list; `None` if it holds no positive.
///
/// # Examples
///
/// ```
/// use ncp_map::average_precision::average_precision;
///
/// assert_eq!(average_precision(&[true, true, false]), Some(1.0));
/// assert_eq!(average_precision(&[false, true]), Some(0.5));
/// assert_eq!(average_precision(&[false, false]), None);
/// ```
#[must_use]
pub fn average_precision(relevance: &[bool]) -> Option<f64> {
    let n_pos = relevance.iter().filter(|&&r| r).count();
    if n_pos == 0 {
        return None;
    }
    let ranks = relevance
        .iter()
        .enumerate()
        .filter(|(_, r)| **r)
        .map(|(i, _)| i + 1);
    Some(ap_from_ranks(ranks, n_pos))
}

/// Scores every rank list of a concatenated relevance sequence.
///
/// Returns one score per entry of `counts` along with the signatures the
/// scores were computed for.
///
/// # Errors
///
/// Returns [`MapError::LengthMismatch`] if `counts` does not account for
/// exactly every flag in `relevance`.
pub fn compute_ap(
    relevance: &[bool],
    counts: &[Signature],
) -> Result<(Vec<Option<f64>>, Vec<Signature>), MapError> {
    let total = counts.iter().map(|s| s.total()).sum::<usize>();
    if total != relevance.len() {
        return Err(MapError::LengthMismatch {
            what: "relevance flags",
            expected: total,
            found: relevance.len(),
        });
    }

    let mut offset = 0;
    let scores = counts
        .iter()
        .map(|signature| {
            let list = &relevance[offset..offset + signature.total()];
            offset += signature.total();
            average_precision(list)
        })
        .collect();
    Ok((scores, counts.to_vec()))
}
