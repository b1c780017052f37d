//! Cross-validated logistic regression over group-disjoint folds.

use ncp_profile::FeatureMatrix;
use ncp_stats::descriptive::DescriptiveStats;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    ClassifyError, Target,
    imputer::MedianImputer,
    logistic::LogisticRegression,
    split::{Fold, Splitter},
};

/// Outcome of one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldResult {
    /// Fold number (0-indexed).
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Held-out accuracy.
    pub accuracy: f64,
    /// Logistic regression weight of every feature, in column order.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationResult {
    pub mean_accuracy: f64,
    /// Population standard deviation of the fold accuracies.
    pub std_accuracy: f64,
    /// Mean weight of every feature across folds, largest first.
    pub feature_importances: Vec<FeatureWeight>,
    pub folds: Vec<FoldResult>,
}

/// Cross-validates with [`Splitter::GroupKFold`].
///
/// # Errors
///
/// See [`cross_validate`].
pub fn group_kfold_cross_validate<G>(
    features: &FeatureMatrix,
    target: &Target,
    groups: &[G],
    n_splits: usize,
) -> Result<CrossValidationResult, ClassifyError>
where
    G: Ord,
{
    cross_validate(
        features,
        target,
        groups,
        &Splitter::GroupKFold { n_splits },
        &LogisticRegression::default(),
    )
}

/// Fits `model` on the training rows of every fold and scores it on the
/// test rows.
///
/// Missing values are imputed with medians learned from the training rows of
/// each fold only. Folds are fitted in parallel.
///
/// # Errors
///
/// - [`ClassifyError::LengthMismatch`] if `target` or `groups` do not have one
///   entry per row
/// - [`ClassifyError::TooFewGroups`] / [`ClassifyError::InvalidTrainSize`]
///   from the splitter
/// - [`ClassifyError::SingleClassFold`] if a fold trains on a single class
pub fn cross_validate<G>(
    features: &FeatureMatrix,
    target: &Target,
    groups: &[G],
    splitter: &Splitter,
    model: &LogisticRegression,
) -> Result<CrossValidationResult, ClassifyError>
where
    G: Ord,
{
    let n_rows = features.n_rows();
    for (what, found) in [("target", target.len()), ("groups", groups.len())] {
        if found != n_rows {
            return Err(ClassifyError::LengthMismatch {
                what,
                expected: n_rows,
                found,
            });
        }
    }

    let folds = splitter.split(groups)?;
    for (i, fold) in folds.iter().enumerate() {
        let labels = target.select(&fold.train);
        if labels.iter().all(|&l| l) || labels.iter().all(|&l| !l) {
            return Err(ClassifyError::SingleClassFold { fold: i });
        }
    }

    let folds = folds
        .par_iter()
        .enumerate()
        .map(|(i, fold)| fit_fold(features, target, model, i, fold))
        .collect::<Result<Vec<_>, _>>()?;

    let accuracy = DescriptiveStats::new(folds.iter().map(|f| f.accuracy))
        .ok_or(ClassifyError::TooFewGroups {
            groups: 0,
            n_splits: 0,
        })?;

    #[expect(clippy::cast_precision_loss)]
    let n_folds = folds.len() as f64;
    let mut feature_importances = features
        .names()
        .iter()
        .enumerate()
        .map(|(col, name)| FeatureWeight {
            feature: name.clone(),
            weight: folds.iter().map(|f| f.coefficients[col]).sum::<f64>() / n_folds,
        })
        .collect::<Vec<_>>();
    feature_importances.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    tracing::debug!(
        folds = folds.len(),
        mean_accuracy = accuracy.mean,
        "cross-validation finished"
    );
    Ok(CrossValidationResult {
        mean_accuracy: accuracy.mean,
        std_accuracy: accuracy.std_dev,
        feature_importances,
        folds,
    })
}

fn fit_fold(
    features: &FeatureMatrix,
    target: &Target,
    model: &LogisticRegression,
    index: usize,
    fold: &Fold,
) -> Result<FoldResult, ClassifyError> {
    let imputer = MedianImputer::fit(features, &fold.train);
    let x_train = imputer.transform(features, &fold.train);
    let x_test = imputer.transform(features, &fold.test);
    let y_train = target.select(&fold.train);
    let y_test = target.select(&fold.test);

    let fitted = model.fit(&x_train, &y_train)?;
    Ok(FoldResult {
        fold: index,
        n_train: fold.train.len(),
        n_test: fold.test.len(),
        accuracy: fitted.accuracy(&x_test, &y_test),
        coefficients: fitted.coefficients,
        intercept: fitted.intercept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    /// Six lines of two rows each; `signal` separates the classes, `noise` does not.
    fn dataset() -> (FeatureMatrix, Target, Vec<String>) {
        let rows = [
            (0, 0.1, 0.3),
            (0, 0.2, -0.2),
            (0, -0.1, 0.1),
            (0, 0.0, 0.4),
            (0, 0.3, -0.1),
            (0, 0.1, 0.0),
            (1, 2.1, 0.2),
            (1, 1.9, -0.3),
            (1, 2.3, 0.1),
            (1, 2.0, 0.3),
            (1, 1.8, -0.2),
            (1, 2.2, 0.0),
        ];
        let features = FeatureMatrix::from_rows(
            vec!["noise".into(), "signal".into()],
            &rows.iter().map(|&(_, s, n)| vec![n, s]).collect::<Vec<_>>(),
        )
        .unwrap();
        let target = Target::new(rows.iter().map(|&(y, _, _)| y).collect()).unwrap();
        let groups = (0..rows.len()).map(|i| format!("line{}", i / 2)).collect();
        (features, target, groups)
    }

    #[test]
    fn test_separable_signal() {
        let (features, target, groups) = dataset();
        let result = group_kfold_cross_validate(&features, &target, &groups, 3).unwrap();
        assert_eq!(result.folds.len(), 3);
        assert!((result.mean_accuracy - 1.0).abs() < TOL);
        assert!(result.std_accuracy.abs() < TOL);
        assert_eq!(result.feature_importances[0].feature, "signal");
        assert!(result.feature_importances[0].weight > 0.0);
    }

    #[test]
    fn test_missing_values_are_imputed() {
        let (features, target, groups) = dataset();
        let mut rows = features.rows().map(<[f64]>::to_vec).collect::<Vec<_>>();
        rows[0][0] = f64::NAN;
        rows[7][1] = f64::NAN;
        let features = FeatureMatrix::from_rows(features.names().to_vec(), &rows).unwrap();
        let result = group_kfold_cross_validate(&features, &target, &groups, 3).unwrap();
        assert!(result.mean_accuracy.is_finite());
        assert!(
            result
                .folds
                .iter()
                .all(|f| f.coefficients.iter().all(|c| c.is_finite()))
        );
    }

    #[test]
    fn test_single_class_training_fold() {
        let (features, _, groups) = dataset();
        // the last line is the only positive one: its fold trains on class 0 only
        let target = Target::new((0..12).map(|i| i64::from(i >= 10)).collect()).unwrap();
        assert_eq!(
            group_kfold_cross_validate(&features, &target, &groups, 6),
            Err(ClassifyError::SingleClassFold { fold: 5 })
        );
    }

    #[test]
    fn test_shuffle_split_is_reproducible() {
        let (features, target, groups) = dataset();
        let splitter = Splitter::GroupShuffleSplit {
            train_size: 0.5,
            seed: 7,
        };
        let model = LogisticRegression::default();
        let a = cross_validate(&features, &target, &groups, &splitter, &model);
        let b = cross_validate(&features, &target, &groups, &splitter, &model);
        assert_eq!(a, b);
    }

    #[test]
    fn test_length_mismatch() {
        let (features, target, _) = dataset();
        assert!(matches!(
            group_kfold_cross_validate(&features, &target, &["a", "b"], 2),
            Err(ClassifyError::LengthMismatch { what: "groups", .. })
        ));
    }
}
