// =============================================================================
// Response State
// =============================================================================
//
// One `ResponseState` per model. It owns the response vector and every
// per-observation quantity the IRLS loop reads or rewrites:
//
//     eta      linear predictor (offset already folded in)
//     mu       mean, g_inv(eta)
//     wrkresid working residual  (y - mu) / (d mu / d eta)
//     wrkwt    working weight    d mu/d eta        (canonical pair)
//                                mu_eta^2 / V(mu)  (general case)
//     devresid SQUARED deviance residual, prior-weighted
//
// `update_linear_predictor` recomputes all of them from a candidate eta in a
// single pass. Each observation reads only its own y/eta and writes only its
// own slots, so there is no ordering requirement between elements; the outer
// IRLS iterations are what must stay sequential.
//
// PRIOR WEIGHTS
// -------------
// Prior weights multiply the deviance residual and the working weight but NOT
// the working residual. The asymmetry is intentional: weighting reaches the
// weighted least-squares solve only through the working weight, and applying
// it to the residual as well would count it twice.
//
// =============================================================================

use ndarray::{Array1, Zip};

use crate::error::{GlimError, Result};
use crate::families::{is_canonical_pair, Family};
use crate::links::Link;

/// Mutable per-model response state, rewritten in place on every IRLS
/// iteration. Never resized after construction.
pub struct ResponseState {
    y: Array1<f64>,
    family: Box<dyn Family>,
    link: Box<dyn Link>,
    eta: Array1<f64>,
    mu: Array1<f64>,
    /// Length 0 (unused) or n.
    offset: Array1<f64>,
    /// Length 0 (unused) or n.
    prior_weights: Array1<f64>,
    dev_resid: Array1<f64>,
    working_weights: Array1<f64>,
    working_residuals: Array1<f64>,
    /// Cached canonical-pair lookup for this (family, link).
    canonical: bool,
}

impl std::fmt::Debug for ResponseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseState")
            .field("y", &self.y)
            .field("eta", &self.eta)
            .field("mu", &self.mu)
            .field("offset", &self.offset)
            .field("prior_weights", &self.prior_weights)
            .field("dev_resid", &self.dev_resid)
            .field("working_weights", &self.working_weights)
            .field("working_residuals", &self.working_residuals)
            .field("canonical", &self.canonical)
            .finish_non_exhaustive()
    }
}

impl ResponseState {
    /// Build the state for a response vector, validating support and the
    /// offset/weight shapes, then seed mu from the family's initial-mean
    /// heuristic and run the first refresh.
    pub fn new(
        y: Array1<f64>,
        family: Box<dyn Family>,
        link: Box<dyn Link>,
        offset: Array1<f64>,
        prior_weights: Array1<f64>,
    ) -> Result<Self> {
        let n = y.len();
        if n == 0 {
            return Err(GlimError::EmptyInput("response vector is empty".to_string()));
        }
        if !offset.is_empty() && offset.len() != n {
            return Err(GlimError::DimensionMismatch(format!(
                "offset has {} elements but y has {}",
                offset.len(),
                n
            )));
        }
        if !prior_weights.is_empty() && prior_weights.len() != n {
            return Err(GlimError::DimensionMismatch(format!(
                "weights has {} elements but y has {}",
                prior_weights.len(),
                n
            )));
        }
        if prior_weights.iter().any(|&w| !(w >= 0.0) || !w.is_finite()) {
            return Err(GlimError::InvalidValue(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        for (i, &yi) in y.iter().enumerate() {
            if !family.in_support(yi) {
                return Err(GlimError::UnsupportedResponse(format!(
                    "y[{}] = {} is outside the support of the {} family",
                    i,
                    yi,
                    family.name()
                )));
            }
        }

        let canonical = is_canonical_pair(family.name(), link.name());
        let mut state = Self {
            y,
            family,
            link,
            eta: Array1::zeros(n),
            mu: Array1::zeros(n),
            offset,
            prior_weights,
            dev_resid: Array1::zeros(n),
            working_weights: Array1::zeros(n),
            working_residuals: Array1::zeros(n),
            canonical,
        };
        state.seed()?;
        Ok(state)
    }

    /// Seed mu from the family heuristic, eta from the link, and refresh the
    /// derived vectors. Called at construction and whenever the prior
    /// weights change (the Bernoulli/Binomial seed depends on them).
    fn seed(&mut self) -> Result<()> {
        for i in 0..self.y.len() {
            let wt = self.prior_weight(i);
            let mu0 = self.family.initial_mean(self.y[i], wt);
            self.eta[i] = self.link.link(mu0);
        }
        self.refresh()
    }

    /// Replace the offset vector. Empty means "no offset".
    pub(crate) fn set_offset(&mut self, offset: Array1<f64>) -> Result<()> {
        if !offset.is_empty() && offset.len() != self.y.len() {
            return Err(GlimError::DimensionMismatch(format!(
                "offset has {} elements but y has {}",
                offset.len(),
                self.y.len()
            )));
        }
        self.offset = offset;
        self.seed()
    }

    /// Replace the prior weights. Empty means "unweighted".
    pub(crate) fn set_prior_weights(&mut self, weights: Array1<f64>) -> Result<()> {
        if !weights.is_empty() && weights.len() != self.y.len() {
            return Err(GlimError::DimensionMismatch(format!(
                "weights has {} elements but y has {}",
                weights.len(),
                self.y.len()
            )));
        }
        if weights.iter().any(|&w| !(w >= 0.0) || !w.is_finite()) {
            return Err(GlimError::InvalidValue(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        self.prior_weights = weights;
        self.seed()
    }

    /// Store a candidate linear predictor (plus offset, when present) and
    /// recompute mu and the working/deviance vectors from it.
    ///
    /// Returns `DomainFailure` if any per-observation quantity comes out
    /// non-finite; the caller decides whether that is fatal (initialization)
    /// or a backtracking signal (trial steps).
    pub fn update_linear_predictor(&mut self, candidate: &Array1<f64>) -> Result<()> {
        debug_assert_eq!(candidate.len(), self.y.len());
        if self.offset.is_empty() {
            self.eta.assign(candidate);
        } else {
            Zip::from(&mut self.eta)
                .and(candidate)
                .and(&self.offset)
                .for_each(|eta, &c, &o| *eta = c + o);
        }
        self.refresh()
    }

    /// Recompute mu, working residual/weight, and deviance residual for every
    /// observation from the stored eta.
    fn refresh(&mut self) -> Result<()> {
        let mut finite = true;
        for i in 0..self.y.len() {
            let yi = self.y[i];
            let eval = self.link.inverse_with_derivative(self.eta[i]);
            let variance = match eval.unit_variance {
                Some(v) if self.family.unit_interval() => v,
                _ => self.family.variance(eval.mu),
            };
            let wrkresid = (yi - eval.mu) / eval.mu_eta;
            let mut wrkwt = if self.canonical {
                eval.mu_eta
            } else {
                eval.mu_eta * eval.mu_eta / variance
            };
            let mut devresid = self.family.unit_deviance(yi, eval.mu);
            if !self.prior_weights.is_empty() {
                let wt = self.prior_weights[i];
                wrkwt *= wt;
                devresid *= wt;
            }
            self.mu[i] = eval.mu;
            self.working_residuals[i] = wrkresid;
            self.working_weights[i] = wrkwt;
            self.dev_resid[i] = devresid;
            finite &= wrkresid.is_finite() && wrkwt.is_finite() && devresid.is_finite();
        }
        if finite {
            Ok(())
        } else {
            Err(GlimError::DomainFailure)
        }
    }

    /// Sum of (prior-weighted) squared deviance residuals.
    pub fn deviance(&self) -> f64 {
        self.dev_resid.sum()
    }

    /// Total log-likelihood at the current mu, with the dispersion estimated
    /// as deviance over total prior weight.
    pub fn log_likelihood(&self) -> f64 {
        let dispersion = self.deviance() / self.total_prior_weight();
        let mut ll = 0.0;
        for i in 0..self.y.len() {
            ll += self
                .family
                .loglik_term(self.y[i], self.mu[i], self.prior_weight(i), dispersion);
        }
        ll
    }

    /// The working response eta - offset + working residual: the target of
    /// the very first weighted least-squares solve.
    pub fn working_response(&self) -> Array1<f64> {
        let mut z = &self.eta + &self.working_residuals;
        if !self.offset.is_empty() {
            z -= &self.offset;
        }
        z
    }

    pub fn num_obs(&self) -> usize {
        self.y.len()
    }

    pub fn has_offset(&self) -> bool {
        !self.offset.is_empty()
    }

    pub fn has_prior_weights(&self) -> bool {
        !self.prior_weights.is_empty()
    }

    /// Prior weight of one observation; 1 when unweighted.
    pub fn prior_weight(&self, i: usize) -> f64 {
        if self.prior_weights.is_empty() {
            1.0
        } else {
            self.prior_weights[i]
        }
    }

    /// Sum of prior weights; n when unweighted.
    pub fn total_prior_weight(&self) -> f64 {
        if self.prior_weights.is_empty() {
            self.y.len() as f64
        } else {
            self.prior_weights.sum()
        }
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn eta(&self) -> &Array1<f64> {
        &self.eta
    }

    pub fn mu(&self) -> &Array1<f64> {
        &self.mu
    }

    pub fn working_weights(&self) -> &Array1<f64> {
        &self.working_weights
    }

    /// The prior-weight vector; empty when the model is unweighted.
    pub fn prior_weights(&self) -> &Array1<f64> {
        &self.prior_weights
    }

    pub fn working_residuals(&self) -> &Array1<f64> {
        &self.working_residuals
    }

    pub fn family(&self) -> &dyn Family {
        self.family.as_ref()
    }

    pub fn link(&self) -> &dyn Link {
        self.link.as_ref()
    }
}

// =============================================================================
// Tests
// =============================================================================
