// =============================================================================
// Distribution Families
// =============================================================================
//
// A family describes the random part of a GLM: how the variance of an
// observation depends on its mean, how far an observation sits from a fitted
// mean (the unit deviance), and its log-likelihood contribution. The fitting
// loop only ever talks to the `Family` trait, so adding a distribution means
// implementing one small trait.
//
// CONVENTIONS
// -----------
//   - `unit_deviance` is the SQUARED deviance residual d_i >= 0; the model
//     deviance is the (prior-weighted) sum of these.
//   - Bernoulli and Binomial accept any response in [0, 1], not just 0/1:
//     grouped binomial data arrives as a success proportion with the trial
//     count passed as the prior weight.
//   - `has_dispersion` marks families with a free scale parameter (Gaussian,
//     Gamma). It drives degrees-of-freedom accounting and the choice between
//     z- and t-based inference.
//
// =============================================================================

use std::f64::consts::PI;

use statrs::function::gamma::ln_gamma;

use crate::error::{GlimError, Result};
use crate::links::{IdentityLink, Link, LogLink, LogitLink};

/// x * ln(y), with the convention 0 * ln(anything) = 0.
///
/// Keeps boundary responses (y exactly 0 or 1, Poisson zeros) from turning a
/// vanishing term into NaN via 0 * -inf.
pub(crate) fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

/// A distribution family. Implementations are stateless unit structs shared
/// behind `Box<dyn Family>`.
pub trait Family: Send + Sync {
    /// Stable tag, used for canonical-pair lookup and error messages.
    fn name(&self) -> &'static str;

    /// The variance function V(mu).
    fn variance(&self, mu: f64) -> f64;

    /// The squared deviance residual of one observation. Nonnegative.
    fn unit_deviance(&self, y: f64, mu: f64) -> f64;

    /// Log-likelihood contribution of one observation at the given prior
    /// weight and dispersion.
    fn loglik_term(&self, y: f64, mu: f64, weight: f64, dispersion: f64) -> f64;

    /// Whether a response value lies in the support of the distribution.
    fn in_support(&self, y: f64) -> bool;

    /// Starting mean for one observation, used to seed the first iteration.
    fn initial_mean(&self, y: f64, weight: f64) -> f64;

    /// Whether the family carries a free dispersion parameter.
    fn has_dispersion(&self) -> bool;

    /// Whether the mean lives on the unit interval. Unit-interval families
    /// use the link-supplied stable mu*(1-mu) in the working weight.
    fn unit_interval(&self) -> bool {
        false
    }

    /// The conventional link for this family.
    fn default_link(&self) -> Box<dyn Link>;
}

// =============================================================================
// Gaussian
// =============================================================================

pub struct GaussianFamily;

impl Family for GaussianFamily {
    fn name(&self) -> &'static str {
        "Gaussian"
    }

    fn variance(&self, _mu: f64) -> f64 {
        1.0
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        (y - mu) * (y - mu)
    }

    fn loglik_term(&self, y: f64, mu: f64, weight: f64, dispersion: f64) -> f64 {
        -0.5 * weight * ((y - mu) * (y - mu) / dispersion + (2.0 * PI * dispersion).ln())
    }

    fn in_support(&self, y: f64) -> bool {
        y.is_finite()
    }

    fn initial_mean(&self, y: f64, _weight: f64) -> f64 {
        y
    }

    fn has_dispersion(&self) -> bool {
        true
    }

    fn default_link(&self) -> Box<dyn Link> {
        Box::new(IdentityLink)
    }
}

// =============================================================================
// Bernoulli
// =============================================================================

pub struct BernoulliFamily;

impl Family for BernoulliFamily {
    fn name(&self) -> &'static str {
        "Bernoulli"
    }

    fn variance(&self, mu: f64) -> f64 {
        mu * (1.0 - mu)
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        2.0 * (xlogy(y, y / mu) + xlogy(1.0 - y, (1.0 - y) / (1.0 - mu)))
    }

    fn loglik_term(&self, y: f64, mu: f64, weight: f64, _dispersion: f64) -> f64 {
        weight * (xlogy(y, mu) + xlogy(1.0 - y, 1.0 - mu))
    }

    fn in_support(&self, y: f64) -> bool {
        (0.0..=1.0).contains(&y)
    }

    fn initial_mean(&self, y: f64, weight: f64) -> f64 {
        // shrink toward 1/2 so the seed never starts on the boundary
        (weight * y + 0.5) / (weight + 1.0)
    }

    fn has_dispersion(&self) -> bool {
        false
    }

    fn unit_interval(&self) -> bool {
        true
    }

    fn default_link(&self) -> Box<dyn Link> {
        Box::new(LogitLink)
    }
}

// =============================================================================
// Binomial
// =============================================================================
//
// The response is the success PROPORTION and the prior weight carries the
// trial count, so mean structure and deviance coincide with Bernoulli; only
// the log-likelihood differs by the binomial coefficient.
// =============================================================================

pub struct BinomialFamily;

impl Family for BinomialFamily {
    fn name(&self) -> &'static str {
        "Binomial"
    }

    fn variance(&self, mu: f64) -> f64 {
        mu * (1.0 - mu)
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        2.0 * (xlogy(y, y / mu) + xlogy(1.0 - y, (1.0 - y) / (1.0 - mu)))
    }

    fn loglik_term(&self, y: f64, mu: f64, weight: f64, _dispersion: f64) -> f64 {
        // weight = number of trials, y = k / weight
        let successes = weight * y;
        let failures = weight - successes;
        ln_gamma(weight + 1.0) - ln_gamma(successes + 1.0) - ln_gamma(failures + 1.0)
            + xlogy(successes, mu)
            + xlogy(failures, 1.0 - mu)
    }

    fn in_support(&self, y: f64) -> bool {
        (0.0..=1.0).contains(&y)
    }

    fn initial_mean(&self, y: f64, weight: f64) -> f64 {
        (weight * y + 0.5) / (weight + 1.0)
    }

    fn has_dispersion(&self) -> bool {
        false
    }

    fn unit_interval(&self) -> bool {
        true
    }

    fn default_link(&self) -> Box<dyn Link> {
        Box::new(LogitLink)
    }
}

// =============================================================================
// Poisson
// =============================================================================

pub struct PoissonFamily;

impl Family for PoissonFamily {
    fn name(&self) -> &'static str {
        "Poisson"
    }

    fn variance(&self, mu: f64) -> f64 {
        mu
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        2.0 * (xlogy(y, y / mu) - (y - mu))
    }

    fn loglik_term(&self, y: f64, mu: f64, weight: f64, _dispersion: f64) -> f64 {
        weight * (xlogy(y, mu) - mu - ln_gamma(y + 1.0))
    }

    fn in_support(&self, y: f64) -> bool {
        y.is_finite() && y >= 0.0
    }

    fn initial_mean(&self, y: f64, _weight: f64) -> f64 {
        // keeps log-link seeds finite when y == 0
        y + 0.1
    }

    fn has_dispersion(&self) -> bool {
        false
    }

    fn default_link(&self) -> Box<dyn Link> {
        Box::new(LogLink)
    }
}

// =============================================================================
// Gamma
// =============================================================================

pub struct GammaFamily;

impl Family for GammaFamily {
    fn name(&self) -> &'static str {
        "Gamma"
    }

    fn variance(&self, mu: f64) -> f64 {
        mu * mu
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        -2.0 * ((y / mu).ln() - (y - mu) / mu)
    }

    fn loglik_term(&self, y: f64, mu: f64, weight: f64, dispersion: f64) -> f64 {
        // Gamma(shape = 1/phi, scale = mu * phi) log-density
        let shape = dispersion.recip();
        let scale = mu * dispersion;
        weight * ((shape - 1.0) * y.ln() - y / scale - shape * scale.ln() - ln_gamma(shape))
    }

    fn in_support(&self, y: f64) -> bool {
        y.is_finite() && y > 0.0
    }

    fn initial_mean(&self, y: f64, _weight: f64) -> f64 {
        y
    }

    fn has_dispersion(&self) -> bool {
        true
    }

    fn default_link(&self) -> Box<dyn Link> {
        Box::new(LogLink)
    }
}

// =============================================================================
// Name Lookup and Canonical Pairs
// =============================================================================

/// Get a Family trait object from a family name string.
///
/// Handles case-insensitive matching and common aliases. Returns an error for
/// unknown family names instead of silently defaulting.
pub fn family_from_name(name: &str) -> Result<Box<dyn Family>> {
    match name.to_lowercase().as_str() {
        "gaussian" | "normal" => Ok(Box::new(GaussianFamily)),
        "bernoulli" => Ok(Box::new(BernoulliFamily)),
        "binomial" => Ok(Box::new(BinomialFamily)),
        "poisson" => Ok(Box::new(PoissonFamily)),
        "gamma" => Ok(Box::new(GammaFamily)),
        _ => Err(GlimError::InvalidValue(format!(
            "Unknown family '{}'. Use 'gaussian', 'bernoulli', 'binomial', \
             'poisson', or 'gamma'.",
            name
        ))),
    }
}

/// Whether (family, link) is a canonical pair for which d(mu)/d(eta) equals
/// the variance function.
///
/// For these pairs the working weight is d(mu)/d(eta) itself; the general
/// formula `mu_eta^2 / V(mu)` would divide two quantities that vanish
/// together and can manufacture a spurious 0/0. Consulted once per model at
/// response-state construction, keyed on the stable name tags.
pub fn is_canonical_pair(family: &str, link: &str) -> bool {
    matches!(
        (family, link),
        ("Bernoulli", "Logit") | ("Binomial", "Logit") | ("Gaussian", "Identity") | ("Poisson", "Log")
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_unit_deviance_zero_at_fitted_mean() {
        let cases: Vec<(Box<dyn Family>, f64)> = vec![
            (Box::new(GaussianFamily), 1.7),
            (Box::new(BernoulliFamily), 0.3),
            (Box::new(BinomialFamily), 0.3),
            (Box::new(PoissonFamily), 2.0),
            (Box::new(GammaFamily), 2.0),
        ];
        for (family, y) in cases {
            assert_abs_diff_eq!(family.unit_deviance(y, y), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bernoulli_boundary_deviance_is_finite() {
        // y exactly 0 and exactly 1 must not produce NaN from 0 * ln(0)
        let d0 = BernoulliFamily.unit_deviance(0.0, 0.25);
        let d1 = BernoulliFamily.unit_deviance(1.0, 0.25);
        assert_abs_diff_eq!(d0, -2.0 * (0.75_f64).ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(d1, -2.0 * (0.25_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_poisson_zero_count() {
        // d(0, mu) = 2 * mu
        assert_abs_diff_eq!(PoissonFamily.unit_deviance(0.0, 1.3), 2.6, epsilon = 1e-12);
        assert!(PoissonFamily.loglik_term(0.0, 1.3, 1.0, 1.0).is_finite());
    }

    #[test]
    fn test_support_checks() {
        assert!(BernoulliFamily.in_support(0.0));
        assert!(BernoulliFamily.in_support(0.4));
        assert!(BernoulliFamily.in_support(1.0));
        assert!(!BernoulliFamily.in_support(1.5));
        assert!(!BinomialFamily.in_support(-0.1));
        assert!(PoissonFamily.in_support(0.0));
        assert!(!PoissonFamily.in_support(-1.0));
        assert!(!GammaFamily.in_support(0.0));
        assert!(GammaFamily.in_support(0.5));
        assert!(GaussianFamily.in_support(-123.4));
        assert!(!GaussianFamily.in_support(f64::NAN));
    }

    #[test]
    fn test_binomial_single_trial_matches_bernoulli() {
        // with one trial the combinatorial term vanishes
        let b = BinomialFamily.loglik_term(1.0, 0.7, 1.0, 1.0);
        let bern = BernoulliFamily.loglik_term(1.0, 0.7, 1.0, 1.0);
        assert_abs_diff_eq!(b, bern, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_loglik_is_normal_logpdf() {
        use statrs::distribution::{Continuous, Normal};
        let ll = GaussianFamily.loglik_term(1.2, 0.8, 1.0, 2.0);
        let normal = Normal::new(0.8, 2.0_f64.sqrt()).unwrap();
        assert_relative_eq!(ll, normal.ln_pdf(1.2), epsilon = 1e-12);
    }

    #[test]
    fn test_initial_mean_stays_interior() {
        assert!(BernoulliFamily.initial_mean(0.0, 1.0) > 0.0);
        assert!(BernoulliFamily.initial_mean(1.0, 1.0) < 1.0);
        assert!(PoissonFamily.initial_mean(0.0, 1.0) > 0.0);
    }

    #[test]
    fn test_dispersion_flags() {
        assert!(GaussianFamily.has_dispersion());
        assert!(GammaFamily.has_dispersion());
        assert!(!BernoulliFamily.has_dispersion());
        assert!(!BinomialFamily.has_dispersion());
        assert!(!PoissonFamily.has_dispersion());
    }

    #[test]
    fn test_family_from_name_aliases() {
        assert_eq!(family_from_name("NORMAL").unwrap().name(), "Gaussian");
        assert_eq!(family_from_name("poisson").unwrap().name(), "Poisson");
        assert!(family_from_name("tweedie").is_err());
    }

    #[test]
    fn test_canonical_pairs() {
        assert!(is_canonical_pair("Bernoulli", "Logit"));
        assert!(is_canonical_pair("Binomial", "Logit"));
        assert!(is_canonical_pair("Gaussian", "Identity"));
        assert!(is_canonical_pair("Poisson", "Log"));
        assert!(!is_canonical_pair("Gamma", "Log"));
        assert!(!is_canonical_pair("Poisson", "Identity"));
        assert!(!is_canonical_pair("Bernoulli", "Probit"));
    }
}
