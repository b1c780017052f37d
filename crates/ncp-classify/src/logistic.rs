//! L2-regularised binary logistic regression.
//!
//! The model minimises
//!
//! ```text
//! ½‖w‖² + C · Σᵢ [ log(1 + exp(zᵢ)) − yᵢ·zᵢ ],   zᵢ = w·xᵢ + b
//! ```
//!
//! with Newton's method. The intercept `b` is not penalised. The objective is
//! strictly convex in `w`, so the Hessian is positive definite and every
//! Newton system is solved with a Cholesky factorisation; steps are halved
//! until the objective decreases.

use crate::ClassifyError;

const MAX_HALVINGS: usize = 50;
/// Keeps the intercept row of the Hessian invertible when every sample is
/// predicted with certainty.
const INTERCEPT_JITTER: f64 = 1e-12;

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegression {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    /// Convergence threshold on the largest gradient component.
    pub tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-8,
        }
    }
}

/// A fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticModel {
    #[must_use]
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        dot(&self.coefficients, x) + self.intercept
    }

    /// Predicts class 1 when the decision function is positive.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> bool {
        self.decision_function(x) > 0.0
    }

    /// Fraction of rows whose predicted class equals `y`.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn accuracy(&self, x: &[Vec<f64>], y: &[bool]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let correct = x
            .iter()
            .zip(y)
            .filter(|(row, label)| self.predict(row) == **label)
            .count();
        correct as f64 / x.len() as f64
    }
}

impl LogisticRegression {
    /// Fits the model on rows `x` with labels `y`.
    ///
    /// # Errors
    ///
    /// - [`ClassifyError::LengthMismatch`] if `x` and `y` differ in length
    /// - [`ClassifyError::IllConditioned`] if a Newton system cannot be solved
    pub fn fit(&self, x: &[Vec<f64>], y: &[bool]) -> Result<LogisticModel, ClassifyError> {
        if x.len() != y.len() {
            return Err(ClassifyError::LengthMismatch {
                what: "labels",
                expected: x.len(),
                found: y.len(),
            });
        }
        let n_features = x.first().map_or(0, Vec::len);
        let k = n_features + 1;
        // coefficients followed by the intercept
        let mut theta = vec![0.0; k];
        let mut objective = self.objective(x, y, &theta);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.max_iter {
            iterations += 1;
            let (gradient, hessian) = self.derivatives(x, y, &theta);
            if max_abs(&gradient) < self.tol {
                converged = true;
                break;
            }
            let delta =
                cholesky_solve(&hessian, &gradient, k).ok_or(ClassifyError::IllConditioned)?;

            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_HALVINGS {
                let candidate = theta
                    .iter()
                    .zip(&delta)
                    .map(|(t, d)| t - step * d)
                    .collect::<Vec<_>>();
                let value = self.objective(x, y, &candidate);
                if value <= objective {
                    accepted = Some((candidate, value));
                    break;
                }
                step *= 0.5;
            }
            let Some((candidate, value)) = accepted else {
                // no decrease along the Newton direction: at the optimum up to rounding
                converged = true;
                break;
            };
            theta = candidate;
            objective = value;
            if step * max_abs(&delta) < self.tol {
                converged = true;
                break;
            }
        }
        if !converged {
            tracing::warn!(iterations, "logistic regression stopped before convergence");
        }

        let intercept = theta[n_features];
        theta.truncate(n_features);
        Ok(LogisticModel {
            coefficients: theta,
            intercept,
            iterations,
            converged,
        })
    }

    fn objective(&self, x: &[Vec<f64>], y: &[bool], theta: &[f64]) -> f64 {
        let (w, b) = theta.split_at(theta.len() - 1);
        let penalty = 0.5 * dot(w, w);
        let loss = x
            .iter()
            .zip(y)
            .map(|(row, &label)| {
                let z = dot(w, row) + b[0];
                softplus(z) - if label { z } else { 0.0 }
            })
            .sum::<f64>();
        penalty + self.c * loss
    }

    /// Gradient and row-major Hessian of the objective at `theta`.
    fn derivatives(&self, x: &[Vec<f64>], y: &[bool], theta: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let k = theta.len();
        let n_features = k - 1;
        let (w, b) = theta.split_at(n_features);

        let mut gradient = vec![0.0; k];
        let mut hessian = vec![0.0; k * k];
        gradient[..n_features].copy_from_slice(w);
        for i in 0..n_features {
            hessian[i * k + i] = 1.0;
        }
        hessian[k * k - 1] = INTERCEPT_JITTER;

        for (row, &label) in x.iter().zip(y) {
            let p = sigmoid(dot(w, row) + b[0]);
            let residual = self.c * (p - f64::from(u8::from(label)));
            let weight = self.c * p * (1.0 - p);
            for i in 0..k {
                let xi = row.get(i).copied().unwrap_or(1.0);
                gradient[i] += residual * xi;
                for j in 0..=i {
                    let xj = row.get(j).copied().unwrap_or(1.0);
                    hessian[i * k + j] += weight * xi * xj;
                }
            }
        }
        for i in 0..k {
            for j in 0..i {
                hessian[j * k + i] = hessian[i * k + j];
            }
        }
        (gradient, hessian)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(z))` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Solves `a · x = rhs` for a symmetric positive definite `k × k` matrix.
///
/// Returns `None` if `a` is not positive definite.
fn cholesky_solve(a: &[f64], rhs: &[f64], k: usize) -> Option<Vec<f64>> {
    // a = l · lᵀ
    let mut l = vec![0.0; k * k];
    for i in 0..k {
        for j in 0..=i {
            let mut sum = a[i * k + j];
            for p in 0..j {
                sum -= l[i * k + p] * l[j * k + p];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i * k + j] = sum.sqrt();
            } else {
                l[i * k + j] = sum / l[j * k + j];
            }
        }
    }

    // l · y = rhs
    let mut y = vec![0.0; k];
    for i in 0..k {
        let mut sum = rhs[i];
        for j in 0..i {
            sum -= l[i * k + j] * y[j];
        }
        y[i] = sum / l[i * k + i];
    }

    // lᵀ · x = y
    let mut x = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = y[i];
        for j in i + 1..k {
            sum -= l[j * k + i] * x[j];
        }
        x[i] = sum / l[i * k + i];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    fn overlapping() -> (Vec<Vec<f64>>, Vec<bool>) {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 2.5, 1.5]
            .iter()
            .zip([0.5, -0.3, 0.2, 0.1, -0.4, 0.3, 0.0, 0.6])
            .map(|(&a, b)| vec![a, b])
            .collect();
        let y = vec![false, false, false, true, true, true, false, true];
        (x, y)
    }

    #[test]
    fn test_stationary_point() {
        let (x, y) = overlapping();
        let model = LogisticRegression::default().fit(&x, &y).unwrap();
        assert!(model.converged);

        // ∇ = w + C Σ (σ(z) − y) x and Σ (σ(z) − y) vanish at the optimum
        let mut grad_w = model.coefficients.clone();
        let mut grad_b = 0.0;
        for (row, &label) in x.iter().zip(&y) {
            let r = sigmoid(model.decision_function(row)) - f64::from(u8::from(label));
            grad_w[0] += r * row[0];
            grad_w[1] += r * row[1];
            grad_b += r;
        }
        assert!(grad_w.iter().all(|g| g.abs() < TOL), "{grad_w:?}");
        assert!(grad_b.abs() < TOL);
        assert!(model.coefficients[0] > 0.0);
    }

    #[test]
    fn test_separable_data_stays_finite() {
        let x = vec![vec![-2.0], vec![-1.0], vec![1.0], vec![2.0]];
        let y = vec![false, false, true, true];
        let model = LogisticRegression::default().fit(&x, &y).unwrap();
        assert!(model.coefficients[0].is_finite());
        assert!((model.accuracy(&x, &y) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stronger_regularisation_shrinks_weights() {
        let (x, y) = overlapping();
        let loose = LogisticRegression::default().fit(&x, &y).unwrap();
        let tight = LogisticRegression {
            c: 0.01,
            ..LogisticRegression::default()
        }
        .fit(&x, &y)
        .unwrap();
        assert!(tight.coefficients[0].abs() < loose.coefficients[0].abs());
    }

    #[test]
    fn test_cholesky_solve() {
        let a = [4.0, 2.0, 2.0, 3.0];
        let x = cholesky_solve(&a, &[2.0, 1.0], 2).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
        assert!(cholesky_solve(&[0.0, 0.0, 0.0, 1.0], &[1.0, 1.0], 2).is_none());
    }

    #[test]
    fn test_softplus_is_stable() {
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
        assert!((softplus(800.0) - 800.0).abs() < 1e-12);
        assert!(softplus(-800.0) >= 0.0);
        assert!(sigmoid(-800.0) >= 0.0 && sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            LogisticRegression::default().fit(&[vec![1.0]], &[]),
            Err(ClassifyError::LengthMismatch { .. })
        ));
    }
}
