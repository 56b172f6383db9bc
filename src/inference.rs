// =============================================================================
// Statistical Inference
// =============================================================================
//
// Coefficient-level inference for fitted models: two-tailed p-values,
// confidence intervals, and the conventional significance codes for summary
// tables. z-based variants assume known dispersion (Bernoulli, Binomial,
// Poisson); t-based variants account for an estimated dispersion (Gaussian,
// Gamma) through the residual degrees of freedom.
//
// All functions return NaN rather than panicking on non-finite or degenerate
// inputs, so a bad coefficient never brings down a whole summary table.
//
// =============================================================================

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Degrees of freedom beyond which the t-distribution is treated as normal.
const NORMAL_APPROX_DF: f64 = 1000.0;

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).unwrap()
}

/// Two-tailed p-value of a z-statistic under the standard normal.
pub fn pvalue_z(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    // P(|Z| > |z|) = 2 * (1 - Phi(|z|))
    2.0 * (1.0 - std_normal().cdf(z.abs()))
}

/// Two-tailed p-value of a t-statistic with `df` degrees of freedom.
pub fn pvalue_t(t: f64, df: f64) -> f64 {
    if !t.is_finite() || df <= 0.0 {
        return f64::NAN;
    }
    if df > NORMAL_APPROX_DF {
        return pvalue_z(t);
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
        Err(_) => f64::NAN,
    }
}

/// Two-sided normal-theory confidence interval `(lower, upper)` at the given
/// level (e.g. 0.95).
pub fn confidence_interval_z(estimate: f64, std_error: f64, level: f64) -> (f64, f64) {
    if !estimate.is_finite() || !std_error.is_finite() || std_error <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let alpha = 1.0 - level;
    let critical = std_normal().inverse_cdf(1.0 - alpha / 2.0);
    let margin = critical * std_error;
    (estimate - margin, estimate + margin)
}

/// Two-sided t confidence interval `(lower, upper)` with `df` degrees of
/// freedom.
pub fn confidence_interval_t(estimate: f64, std_error: f64, df: f64, level: f64) -> (f64, f64) {
    if !estimate.is_finite() || !std_error.is_finite() || std_error <= 0.0 || df <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    if df > NORMAL_APPROX_DF {
        return confidence_interval_z(estimate, std_error, level);
    }
    let dist = match StudentsT::new(0.0, 1.0, df) {
        Ok(d) => d,
        Err(_) => return (f64::NAN, f64::NAN),
    };
    let alpha = 1.0 - level;
    let margin = dist.inverse_cdf(1.0 - alpha / 2.0) * std_error;
    (estimate - margin, estimate + margin)
}

/// Significance codes for a p-value, R-style:
/// `***` below 0.001, `**` below 0.01, `*` below 0.05, `.` below 0.1.
pub fn significance_stars(pvalue: f64) -> &'static str {
    if pvalue < 0.001 {
        "***"
    } else if pvalue < 0.01 {
        "**"
    } else if pvalue < 0.05 {
        "*"
    } else if pvalue < 0.1 {
        "."
    } else {
        ""
    }
}

// =============================================================================
// Tests
// =============================================================================
