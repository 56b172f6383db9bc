// =============================================================================
// Model Fit Measures
// =============================================================================
//
// Likelihood-based comparison measures. `dof` counts every estimated
// parameter: the coefficients plus the dispersion parameter when the family
// has one.
//
// =============================================================================

use ndarray::Array1;

use crate::families::Family;

/// Akaike information criterion: -2 log L + 2 k.
pub fn aic(log_likelihood: f64, dof: usize) -> f64 {
    -2.0 * log_likelihood + 2.0 * dof as f64
}

/// Bayesian information criterion: -2 log L + k ln(n), with n the total
/// prior weight.
pub fn bic(log_likelihood: f64, dof: usize, total_weight: f64) -> f64 {
    -2.0 * log_likelihood + dof as f64 * total_weight.ln()
}

/// Deviance of the trivial fit that assigns every observation the
/// prior-weighted mean response. Offsets are ignored; for offset models this
/// is the conventional common-mean reference, not a refit.
pub fn null_deviance(y: &Array1<f64>, weights: &Array1<f64>, family: &dyn Family) -> f64 {
    let (mut total, mut weight_sum) = (0.0, 0.0);
    for i in 0..y.len() {
        let w = if weights.is_empty() { 1.0 } else { weights[i] };
        total += w * y[i];
        weight_sum += w;
    }
    let mean = total / weight_sum;
    let mut deviance = 0.0;
    for i in 0..y.len() {
        let w = if weights.is_empty() { 1.0 } else { weights[i] };
        deviance += w * family.unit_deviance(y[i], mean);
    }
    deviance
}

// =============================================================================
// Tests
// =============================================================================
