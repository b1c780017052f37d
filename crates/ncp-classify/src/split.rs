//! Group-disjoint train/test splits.
//!
//! Every splitter assigns whole groups to one side of a split, so no group
//! ever contributes rows to both the training and the test set of a fold.

use std::collections::BTreeMap;

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::ClassifyError;

/// Row indices of one train/test split, each in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// How rows are split into folds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Splitter {
    /// `n_splits` folds; each group is the test set of exactly one fold.
    GroupKFold { n_splits: usize },
    /// A single seeded split with about `train_size` of the groups in training.
    GroupShuffleSplit {
        #[serde(default = "default_train_size")]
        train_size: f64,
        #[serde(default = "default_seed")]
        seed: u64,
    },
}

fn default_train_size() -> f64 {
    0.8
}

fn default_seed() -> u64 {
    42
}

impl Default for Splitter {
    fn default() -> Self {
        Self::GroupKFold { n_splits: 5 }
    }
}

impl Splitter {
    /// # Errors
    ///
    /// See [`group_kfold`] and [`group_shuffle_split`].
    pub fn split<G>(&self, groups: &[G]) -> Result<Vec<Fold>, ClassifyError>
    where
        G: Ord,
    {
        match *self {
            Self::GroupKFold { n_splits } => group_kfold(groups, n_splits),
            Self::GroupShuffleSplit { train_size, seed } => {
                group_shuffle_split(groups, train_size, seed).map(|fold| vec![fold])
            }
        }
    }
}

/// Rows of each distinct group, groups in ascending order.
fn members<G>(groups: &[G]) -> Vec<Vec<usize>>
where
    G: Ord,
{
    let mut members = BTreeMap::<&G, Vec<usize>>::new();
    for (row, group) in groups.iter().enumerate() {
        members.entry(group).or_default().push(row);
    }
    members.into_values().collect()
}

fn fold_from_test(n_rows: usize, in_test: &[bool]) -> Fold {
    let (test, train) = (0..n_rows).partition(|&row| in_test[row]);
    Fold { train, test }
}

/// Splits rows into `n_splits` folds of whole groups.
///
/// Groups are taken largest first (ties in group order) and each is added to
/// the test set of the fold with the fewest rows so far, lowest fold index on
/// ties. The assignment is deterministic.
///
/// # Errors
///
/// Returns [`ClassifyError::TooFewGroups`] if `n_splits < 2` or there are
/// fewer distinct groups than folds.
pub fn group_kfold<G>(groups: &[G], n_splits: usize) -> Result<Vec<Fold>, ClassifyError>
where
    G: Ord,
{
    let mut members = members(groups);
    if n_splits < 2 || members.len() < n_splits {
        return Err(ClassifyError::TooFewGroups {
            groups: members.len(),
            n_splits,
        });
    }
    // stable: equal sizes keep group order
    members.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut fold_of_row = vec![0; groups.len()];
    let mut fold_sizes = vec![0; n_splits];
    for rows in &members {
        let (fold, _) = fold_sizes
            .iter()
            .enumerate()
            .min_by_key(|&(i, &size)| (size, i))
            .unwrap_or((0, &0));
        fold_sizes[fold] += rows.len();
        for &row in rows {
            fold_of_row[row] = fold;
        }
    }

    let folds = (0..n_splits)
        .map(|fold| {
            let in_test = fold_of_row.iter().map(|&f| f == fold).collect::<Vec<_>>();
            fold_from_test(groups.len(), &in_test)
        })
        .collect();
    Ok(folds)
}

/// Splits rows once, shuffling the distinct groups with a seeded generator.
///
/// The first `ceil((1 - train_size) * n_groups)` shuffled groups form the
/// test set and the others the training set.
///
/// # Errors
///
/// - [`ClassifyError::InvalidTrainSize`] unless `0 < train_size < 1`
/// - [`ClassifyError::TooFewGroups`] with fewer than two distinct groups
pub fn group_shuffle_split<G>(
    groups: &[G],
    train_size: f64,
    seed: u64,
) -> Result<Fold, ClassifyError>
where
    G: Ord,
{
    if !(train_size > 0.0 && train_size < 1.0) {
        return Err(ClassifyError::InvalidTrainSize { train_size });
    }
    let mut members = members(groups);
    let n_groups = members.len();
    if n_groups < 2 {
        return Err(ClassifyError::TooFewGroups {
            groups: n_groups,
            n_splits: 2,
        });
    }

    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let n_test =
        (((1.0 - train_size) * n_groups as f64).ceil() as usize).clamp(1, n_groups - 1);

    let mut rng = Pcg64::seed_from_u64(seed);
    members.shuffle(&mut rng);
    let mut in_test = vec![false; groups.len()];
    for rows in &members[..n_test] {
        for &row in rows {
            in_test[row] = true;
        }
    }
    Ok(fold_from_test(groups.len(), &in_test))
}
