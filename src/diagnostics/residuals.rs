// =============================================================================
// Residuals
// =============================================================================
//
// Four residual scales, each useful for a different question:
//
//   response  y - mu            raw prediction error
//   pearson   scaled by sqrt(V) comparable across observations
//   deviance  signed sqrt of the deviance contribution; sums of squares
//             reproduce the model deviance
//   working   the IRLS linearization residual (y - mu) / (d mu / d eta)
//
// Prior weights enter pearson and deviance residuals as sqrt(w); an empty
// weight vector means unweighted.
//
// =============================================================================

use ndarray::Array1;

use crate::families::Family;
use crate::links::Link;

fn weight_at(weights: &Array1<f64>, i: usize) -> f64 {
    if weights.is_empty() {
        1.0
    } else {
        weights[i]
    }
}

/// Raw residuals y - mu.
pub fn resid_response(y: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64> {
    y - mu
}

/// Pearson residuals sqrt(w) * (y - mu) / sqrt(V(mu)).
pub fn resid_pearson(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    family: &dyn Family,
    weights: &Array1<f64>,
) -> Array1<f64> {
    Array1::from_shape_fn(y.len(), |i| {
        weight_at(weights, i).sqrt() * (y[i] - mu[i]) / family.variance(mu[i]).sqrt()
    })
}

/// Deviance residuals sign(y - mu) * sqrt(w * d(y, mu)).
pub fn resid_deviance(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    family: &dyn Family,
    weights: &Array1<f64>,
) -> Array1<f64> {
    Array1::from_shape_fn(y.len(), |i| {
        let d = weight_at(weights, i) * family.unit_deviance(y[i], mu[i]);
        (y[i] - mu[i]).signum() * d.sqrt()
    })
}

/// Working residuals (y - mu) / (d mu / d eta), recomputed from the linear
/// predictor.
pub fn resid_working(
    y: &Array1<f64>,
    mu: &Array1<f64>,
    eta: &Array1<f64>,
    link: &dyn Link,
) -> Array1<f64> {
    Array1::from_shape_fn(y.len(), |i| {
        (y[i] - mu[i]) / link.inverse_with_derivative(eta[i]).mu_eta
    })
}

// =============================================================================
// Tests
// =============================================================================
