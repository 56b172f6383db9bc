// =============================================================================
// Weighted Least-Squares Coefficient Solver
// =============================================================================
//
// The linear-algebra collaborator of the IRLS loop. It owns the design
// matrix, the committed coefficients, and one PENDING coefficient delta:
//
//     compute_delta(t, w)      solve (X'WX) d = X'W t, store d as pending
//     trial_linear_predictor(f)  X (beta + f * d), without touching beta
//     commit(f)                beta <- beta + f * d, pending delta cleared
//
// The split lets the driver probe fractional steps cheaply and only commit
// the fraction that survived step-halving.
//
// The normal equations are formed as (W^1/2 X)'(W^1/2 X) - scaling rows by
// sqrt(w) rather than materializing a diagonal W - and solved by Cholesky
// with an LU fallback. A matrix that neither factorization can handle is
// reported as a LinearAlgebraError (usually multicollinearity in X).
//
// =============================================================================

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::convert::{to_array1, to_array2};
use crate::error::{GlimError, Result};

pub struct WlsSolver {
    x: Array2<f64>,
    /// Committed coefficients.
    beta: Array1<f64>,
    /// Pending delta from the last `compute_delta`; zero after `commit`.
    delta: Array1<f64>,
    /// X'WX from the last solve, kept for the covariance query.
    xtwx: Option<DMatrix<f64>>,
}

impl WlsSolver {
    /// A solver over a fixed design matrix, starting from zero coefficients.
    pub fn new(x: Array2<f64>) -> Self {
        let p = x.ncols();
        Self {
            x,
            beta: Array1::zeros(p),
            delta: Array1::zeros(p),
            xtwx: None,
        }
    }

    /// Overwrite the committed coefficients (warm start) and clear any
    /// pending delta.
    pub fn set_coefficients(&mut self, beta: &Array1<f64>) -> Result<()> {
        if beta.len() != self.x.ncols() {
            return Err(GlimError::DimensionMismatch(format!(
                "warm start has {} coefficients but X has {} columns",
                beta.len(),
                self.x.ncols()
            )));
        }
        self.beta.assign(beta);
        self.delta.fill(0.0);
        Ok(())
    }

    /// Solve (X'WX) d = X'W t for the pending delta.
    ///
    /// `target` is the working response at initialization and the working
    /// residual on later iterations; `weights` are the working weights.
    pub fn compute_delta(&mut self, target: &Array1<f64>, weights: &Array1<f64>) -> Result<()> {
        let n = self.x.nrows();
        let p = self.x.ncols();
        debug_assert_eq!(target.len(), n);
        debug_assert_eq!(weights.len(), n);

        // scale rows by sqrt(w) so X'WX = Xw'Xw and X'Wt = Xw'tw
        let sqrt_w: Vec<f64> = weights.iter().map(|w| w.sqrt()).collect();
        let x_weighted = DMatrix::from_fn(n, p, |i, j| self.x[[i, j]] * sqrt_w[i]);
        let t_weighted = DVector::from_iterator(n, target.iter().zip(&sqrt_w).map(|(t, s)| t * s));

        let xtwx = x_weighted.transpose() * &x_weighted;
        let xtwt = x_weighted.transpose() * t_weighted;

        let solution = match xtwx.clone().cholesky() {
            Some(chol) => chol.solve(&xtwt),
            None => xtwx.clone().lu().solve(&xtwt).ok_or_else(|| {
                GlimError::LinearAlgebraError(
                    "failed to solve the weighted normal equations; the design matrix \
                     may be singular (collinear predictors)"
                        .to_string(),
                )
            })?,
        };

        self.delta = to_array1(&solution);
        self.xtwx = Some(xtwx);
        Ok(())
    }

    /// The linear predictor X (beta + step * delta). Pure: committed state is
    /// untouched, so the driver can probe any number of step fractions.
    pub fn trial_linear_predictor(&self, step: f64) -> Array1<f64> {
        let mut trial = self.beta.clone();
        trial.scaled_add(step, &self.delta);
        self.x.dot(&trial)
    }

    /// Fold `step` times the pending delta into the committed coefficients
    /// and clear the pending delta.
    pub fn commit(&mut self, step: f64) {
        self.beta.scaled_add(step, &self.delta);
        self.delta.fill(0.0);
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.beta
    }

    pub fn num_coefficients(&self) -> usize {
        self.x.ncols()
    }

    pub fn num_obs(&self) -> usize {
        self.x.nrows()
    }

    /// (X'WX)^-1 at the weights of the most recent solve; the unscaled
    /// coefficient covariance used for standard errors.
    pub fn unscaled_covariance(&self) -> Result<Array2<f64>> {
        let xtwx = self.xtwx.as_ref().ok_or_else(|| {
            GlimError::LinearAlgebraError(
                "no weighted least-squares solve has been performed".to_string(),
            )
        })?;
        let p = xtwx.nrows();
        let inverse = match xtwx.clone().cholesky() {
            Some(chol) => chol.solve(&DMatrix::identity(p, p)),
            None => xtwx.clone().try_inverse().ok_or_else(|| {
                GlimError::LinearAlgebraError(
                    "X'WX is singular; coefficient covariance is unavailable".to_string(),
                )
            })?,
        };
        Ok(to_array2(&inverse))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn two_column_design() -> Array2<f64> {
        ndarray::Array2::from_shape_vec(
            (4, 2),
            vec![1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0],
        )
        .unwrap()
    }

    #[test]
    fn test_unweighted_delta_is_ols() {
        // y = 1 + 2x exactly; the first solve from zero must recover it
        let mut solver = WlsSolver::new(two_column_design());
        let y = array![1.0, 3.0, 5.0, 7.0];
        let w = array![1.0, 1.0, 1.0, 1.0];
        solver.compute_delta(&y, &w).unwrap();
        solver.commit(1.0);
        assert_abs_diff_eq!(solver.coefficients()[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(solver.coefficients()[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_trial_does_not_mutate_committed_state() {
        let mut solver = WlsSolver::new(two_column_design());
        let y = array![1.0, 3.0, 5.0, 7.0];
        let w = array![1.0, 1.0, 1.0, 1.0];
        solver.compute_delta(&y, &w).unwrap();
        let before = solver.coefficients().clone();
        let half = solver.trial_linear_predictor(0.5);
        let full = solver.trial_linear_predictor(1.0);
        assert_eq!(solver.coefficients(), &before);
        // trial at half the step gives half the prediction of the full step
        for (h, f) in half.iter().zip(full.iter()) {
            assert_abs_diff_eq!(*h, 0.5 * f, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_commit_clears_pending_delta() {
        let mut solver = WlsSolver::new(two_column_design());
        let y = array![1.0, 3.0, 5.0, 7.0];
        let w = array![1.0, 1.0, 1.0, 1.0];
        solver.compute_delta(&y, &w).unwrap();
        solver.commit(0.5);
        let committed = solver.coefficients().clone();
        // a further trial at any step must now reproduce X * beta exactly
        let eta = solver.trial_linear_predictor(1.0);
        let expected = two_column_design().dot(&committed);
        for (e, x) in eta.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*e, *x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_weights_shift_the_solution() {
        // all weight on the first two points pins the line through them
        let mut solver = WlsSolver::new(two_column_design());
        let y = array![0.0, 1.0, 10.0, 10.0];
        let w = array![1e6, 1e6, 1e-6, 1e-6];
        solver.compute_delta(&y, &w).unwrap();
        solver.commit(1.0);
        assert_abs_diff_eq!(solver.coefficients()[0], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(solver.coefficients()[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_singular_design_is_an_error() {
        // duplicate columns make X'WX rank deficient
        let x = ndarray::Array2::from_shape_vec(
            (3, 2),
            vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0],
        )
        .unwrap();
        let mut solver = WlsSolver::new(x);
        let result = solver.compute_delta(&array![1.0, 2.0, 3.0], &array![1.0, 1.0, 1.0]);
        assert!(matches!(result, Err(GlimError::LinearAlgebraError(_))));
    }

    #[test]
    fn test_unscaled_covariance_is_xtwx_inverse() {
        // identity design with unit weights: covariance is the identity
        let x = ndarray::Array2::from_shape_vec(
            (2, 2),
            vec![1.0, 0.0, 0.0, 1.0],
        )
        .unwrap();
        let mut solver = WlsSolver::new(x);
        solver
            .compute_delta(&array![1.0, 2.0], &array![1.0, 1.0])
            .unwrap();
        let cov = solver.unscaled_covariance().unwrap();
        assert_abs_diff_eq!(cov[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cov[[1, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cov[[0, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_warm_start_length_checked() {
        let mut solver = WlsSolver::new(two_column_design());
        let err = solver.set_coefficients(&array![1.0]).unwrap_err();
        assert!(matches!(err, GlimError::DimensionMismatch(_)));
    }
}
