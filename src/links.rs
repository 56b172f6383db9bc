// =============================================================================
// Link Functions
// =============================================================================
//
// A link function g maps the mean response onto the linear predictor scale:
//
//     eta = g(mu)        mu = g_inv(eta)
//
// IRLS needs three things from a link at every observation:
//   - the inverse link mu = g_inv(eta)
//   - its derivative d(mu)/d(eta), which enters the working residual and
//     working weight
//   - for unit-interval links only: mu * (1 - mu) in a cancellation-free
//     form, because recovering it from a saturated mu (mu == 1.0 to machine
//     precision) destroys all of its significant digits
//
// `inverse_with_derivative` returns all three in one evaluation so the pieces
// are always computed from the same intermediate values. Every link is a
// closed form - there is no iteration anywhere in this module - and every
// output is kept finite for finite eta (exponentials are clamped, saturating
// derivatives are floored).
//
// =============================================================================

use std::f64::consts::PI;

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::constants::{MAX_EXP_ARG, MU_ETA_MIN};
use crate::error::{GlimError, Result};

/// One evaluation of an inverse link at a single linear predictor value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkEval {
    /// The mean, g_inv(eta).
    pub mu: f64,
    /// The derivative d(mu)/d(eta) at eta.
    pub mu_eta: f64,
    /// mu * (1 - mu), computed without cancellation. `Some` only for links
    /// whose range is the unit interval (logit, probit, cloglog, cauchit).
    pub unit_variance: Option<f64>,
}

/// A link function. Implementations are stateless unit structs shared behind
/// `Box<dyn Link>`.
pub trait Link: Send + Sync {
    /// Stable tag, used for canonical-pair lookup and error messages.
    fn name(&self) -> &'static str;

    /// Forward map eta = g(mu).
    fn link(&self, mu: f64) -> f64;

    /// Inverse map with derivative (and stable unit-interval variance where
    /// applicable). See module docs.
    fn inverse_with_derivative(&self, eta: f64) -> LinkEval;

    /// Inverse map mu = g_inv(eta).
    fn inverse(&self, eta: f64) -> f64 {
        self.inverse_with_derivative(eta).mu
    }
}

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).unwrap()
}

// =============================================================================
// Identity: eta = mu
// =============================================================================

pub struct IdentityLink;

impl Link for IdentityLink {
    fn name(&self) -> &'static str {
        "Identity"
    }

    fn link(&self, mu: f64) -> f64 {
        mu
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        LinkEval {
            mu: eta,
            mu_eta: 1.0,
            unit_variance: None,
        }
    }
}

// =============================================================================
// Log: eta = ln(mu)
// =============================================================================

pub struct LogLink;

impl Link for LogLink {
    fn name(&self) -> &'static str {
        "Log"
    }

    fn link(&self, mu: f64) -> f64 {
        mu.ln()
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        // mu and d(mu)/d(eta) coincide for the log link
        let mu = eta.min(MAX_EXP_ARG).exp();
        LinkEval {
            mu,
            mu_eta: mu,
            unit_variance: None,
        }
    }
}

// =============================================================================
// Logit: eta = ln(mu / (1 - mu))
// =============================================================================

pub struct LogitLink;

impl Link for LogitLink {
    fn name(&self) -> &'static str {
        "Logit"
    }

    fn link(&self, mu: f64) -> f64 {
        (mu / (1.0 - mu)).ln()
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        // exp of a non-positive argument never overflows; both tails reuse it
        let e = (-eta.abs()).exp();
        let denom = 1.0 + e;
        let mu = if eta >= 0.0 { 1.0 / denom } else { e / denom };
        // mu * (1 - mu) = e / (1 + e)^2, no saturated factor involved
        let unit = e / (denom * denom);
        LinkEval {
            mu,
            mu_eta: unit.max(MU_ETA_MIN),
            unit_variance: Some(unit),
        }
    }
}

// =============================================================================
// Probit: eta = Phi_inv(mu)
// =============================================================================

pub struct ProbitLink;

impl Link for ProbitLink {
    fn name(&self) -> &'static str {
        "Probit"
    }

    fn link(&self, mu: f64) -> f64 {
        std_normal().inverse_cdf(mu)
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        let normal = std_normal();
        let mu = normal.cdf(eta);
        // complement from the symmetric tail, not 1 - mu
        let unit = mu * normal.cdf(-eta);
        LinkEval {
            mu,
            mu_eta: normal.pdf(eta).max(MU_ETA_MIN),
            unit_variance: Some(unit),
        }
    }
}

// =============================================================================
// Complementary log-log: eta = ln(-ln(1 - mu))
// =============================================================================

pub struct CloglogLink;

impl Link for CloglogLink {
    fn name(&self) -> &'static str {
        "CLogLog"
    }

    fn link(&self, mu: f64) -> f64 {
        (-(1.0 - mu).ln()).ln()
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        let t = eta.min(MAX_EXP_ARG).exp();
        // mu = 1 - exp(-t) via expm1, accurate for small t
        let mu = -(-t).exp_m1();
        let complement = (-t).exp();
        LinkEval {
            mu,
            mu_eta: (eta - t).exp().max(MU_ETA_MIN),
            unit_variance: Some(mu * complement),
        }
    }
}

// =============================================================================
// Cauchit: eta = tan(pi * (mu - 1/2))
// =============================================================================

pub struct CauchitLink;

impl Link for CauchitLink {
    fn name(&self) -> &'static str {
        "Cauchit"
    }

    fn link(&self, mu: f64) -> f64 {
        ((mu - 0.5) * PI).tan()
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        let atan = eta.atan() / PI;
        let mu = 0.5 + atan;
        let complement = 0.5 - atan;
        LinkEval {
            mu,
            mu_eta: (1.0 / (PI * (1.0 + eta * eta))).max(MU_ETA_MIN),
            unit_variance: Some(mu * complement),
        }
    }
}

// =============================================================================
// Inverse: eta = 1 / mu (the canonical Gamma link)
// =============================================================================

pub struct InverseLink;

impl Link for InverseLink {
    fn name(&self) -> &'static str {
        "Inverse"
    }

    fn link(&self, mu: f64) -> f64 {
        mu.recip()
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        // eta == 0 produces infinities here; the response update reports that
        // as a domain failure and the driver backtracks
        let mu = eta.recip();
        LinkEval {
            mu,
            mu_eta: -(mu * mu),
            unit_variance: None,
        }
    }
}

// =============================================================================
// Sqrt: eta = sqrt(mu)
// =============================================================================

pub struct SqrtLink;

impl Link for SqrtLink {
    fn name(&self) -> &'static str {
        "Sqrt"
    }

    fn link(&self, mu: f64) -> f64 {
        mu.sqrt()
    }

    fn inverse_with_derivative(&self, eta: f64) -> LinkEval {
        LinkEval {
            mu: eta * eta,
            mu_eta: 2.0 * eta,
            unit_variance: None,
        }
    }
}

// =============================================================================
// Name Lookup
// =============================================================================

/// Get a Link trait object from a link name string.
///
/// Case-insensitive. Returns an error for unknown link names instead of
/// silently defaulting.
pub fn link_from_name(name: &str) -> Result<Box<dyn Link>> {
    match name.to_lowercase().as_str() {
        "identity" => Ok(Box::new(IdentityLink)),
        "log" => Ok(Box::new(LogLink)),
        "logit" => Ok(Box::new(LogitLink)),
        "probit" => Ok(Box::new(ProbitLink)),
        "cloglog" | "clog-log" => Ok(Box::new(CloglogLink)),
        "cauchit" => Ok(Box::new(CauchitLink)),
        "inverse" => Ok(Box::new(InverseLink)),
        "sqrt" => Ok(Box::new(SqrtLink)),
        _ => Err(GlimError::InvalidValue(format!(
            "Unknown link '{}'. Use 'identity', 'log', 'logit', 'probit', \
             'cloglog', 'cauchit', 'inverse', or 'sqrt'.",
            name
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn all_links() -> Vec<Box<dyn Link>> {
        vec![
            Box::new(IdentityLink),
            Box::new(LogLink),
            Box::new(LogitLink),
            Box::new(ProbitLink),
            Box::new(CloglogLink),
            Box::new(CauchitLink),
            Box::new(InverseLink),
            Box::new(SqrtLink),
        ]
    }

    #[test]
    fn test_inverse_round_trip() {
        // g_inv(g(mu)) should recover mu on the interior of each range
        for link in all_links() {
            for &mu in &[0.12, 0.37, 0.5, 0.71, 0.93] {
                let eta = link.link(mu);
                assert_relative_eq!(link.inverse(eta), mu, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_logit_matches_closed_form() {
        let ev = LogitLink.inverse_with_derivative(0.4);
        let mu = 1.0 / (1.0 + (-0.4_f64).exp());
        assert_abs_diff_eq!(ev.mu, mu, epsilon = 1e-15);
        assert_abs_diff_eq!(ev.mu_eta, mu * (1.0 - mu), epsilon = 1e-15);
        assert_abs_diff_eq!(ev.unit_variance.unwrap(), mu * (1.0 - mu), epsilon = 1e-15);
    }

    #[test]
    fn test_logit_saturation_stays_finite() {
        for &eta in &[-800.0, -40.0, 40.0, 800.0] {
            let ev = LogitLink.inverse_with_derivative(eta);
            assert!(ev.mu.is_finite());
            assert!(ev.mu_eta.is_finite());
            assert!(ev.mu_eta > 0.0);
        }
    }

    #[test]
    fn test_logit_unit_variance_beats_naive_product() {
        // At eta = 30 the naive mu * (1 - mu) has lost most of its digits;
        // the direct form keeps full precision. They still agree coarsely.
        let eta = 30.0;
        let ev = LogitLink.inverse_with_derivative(eta);
        let exact = (-eta.abs()).exp() / (1.0 + (-eta.abs()).exp()).powi(2);
        assert_relative_eq!(ev.unit_variance.unwrap(), exact, epsilon = 1e-14);
        let naive = ev.mu * (1.0 - ev.mu);
        assert_relative_eq!(naive, exact, epsilon = 1e-2);
    }

    #[test]
    fn test_log_link_clamps_overflow() {
        let ev = LogLink.inverse_with_derivative(1000.0);
        assert!(ev.mu.is_finite());
        assert!(ev.mu_eta.is_finite());
    }

    #[test]
    fn test_probit_extremes() {
        // cdf saturates well before pdf underflows; both guards must hold
        for &eta in &[-40.0, -10.0, 10.0, 40.0] {
            let ev = ProbitLink.inverse_with_derivative(eta);
            assert!((0.0..=1.0).contains(&ev.mu));
            assert!(ev.mu_eta > 0.0);
            assert!(ev.unit_variance.unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_cloglog_small_eta_accuracy() {
        // mu = 1 - exp(-e^eta) ~ e^eta for very negative eta; expm1 keeps that
        let ev = CloglogLink.inverse_with_derivative(-30.0);
        assert_relative_eq!(ev.mu, (-30.0_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_unit_variance_only_on_unit_interval_links() {
        assert!(IdentityLink.inverse_with_derivative(1.0).unit_variance.is_none());
        assert!(LogLink.inverse_with_derivative(1.0).unit_variance.is_none());
        assert!(InverseLink.inverse_with_derivative(1.0).unit_variance.is_none());
        assert!(SqrtLink.inverse_with_derivative(1.0).unit_variance.is_none());
        assert!(LogitLink.inverse_with_derivative(1.0).unit_variance.is_some());
        assert!(ProbitLink.inverse_with_derivative(1.0).unit_variance.is_some());
        assert!(CloglogLink.inverse_with_derivative(1.0).unit_variance.is_some());
        assert!(CauchitLink.inverse_with_derivative(1.0).unit_variance.is_some());
    }

    #[test]
    fn test_inverse_link_derivative_sign() {
        let ev = InverseLink.inverse_with_derivative(2.0);
        assert_abs_diff_eq!(ev.mu, 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(ev.mu_eta, -0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_link_from_name() {
        assert_eq!(link_from_name("LOGIT").unwrap().name(), "Logit");
        assert_eq!(link_from_name("clog-log").unwrap().name(), "CLogLog");
        assert!(link_from_name("spline").is_err());
    }
}
