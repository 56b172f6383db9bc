// =============================================================================
// Dispersion Estimation
// =============================================================================
//
// Two moment-style estimates of the dispersion parameter phi:
//
//   pearson   chi^2 / df_residual, with chi^2 = sum w (y - mu)^2 / V(mu)
//   deviance  deviance / df_residual
//
// For well-specified Poisson or Binomial models both should sit near 1;
// values well above 1 flag overdispersion.
//
// =============================================================================

use ndarray::Array1;

use crate::families::Family;

/// Pearson chi-squared statistic: sum of w * (y - mu)^2 / V(mu).
pub fn pearson_chi2(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    family: &dyn Family,
    weights: &Array1<f64>,
) -> f64 {
    let mut chi2 = 0.0;
    for i in 0..y.len() {
        let w = if weights.is_empty() { 1.0 } else { weights[i] };
        let r = y[i] - mu[i];
        chi2 += w * r * r / family.variance(mu[i]);
    }
    chi2
}

/// Pearson dispersion estimate chi^2 / df_residual.
pub fn estimate_dispersion_pearson(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    family: &dyn Family,
    weights: &Array1<f64>,
    df_residual: f64,
) -> f64 {
    pearson_chi2(y, mu, family, weights) / df_residual
}

/// Deviance dispersion estimate deviance / df_residual.
pub fn estimate_dispersion_deviance(deviance: f64, df_residual: f64) -> f64 {
    deviance / df_residual
}

// =============================================================================
// Tests
// =============================================================================
