// =============================================================================
// GLM Model Object
// =============================================================================
//
// `Glm` owns everything one fitted model needs: the response state, the
// weighted least-squares solver over the design matrix, and the fitted flag.
// Construction validates shapes and response support; `fit` drives the IRLS
// loop. A failed fit leaves the model constructed but unfit, so callers can
// inspect the partial state and retry with different settings or a warm
// start; a second `fit` on an already-fitted model is a no-op.
//
// Models do not share state: concurrent fits of independent models need no
// synchronization.
//
// =============================================================================

use ndarray::{Array1, Array2};

use crate::diagnostics::{dispersion as disp, model_fit, residuals};
use crate::error::{GlimError, Result};
use crate::families::{family_from_name, Family};
use crate::inference::{confidence_interval_t, confidence_interval_z, pvalue_t, pvalue_z};
use crate::links::{link_from_name, Link};
use crate::response::ResponseState;
use crate::solvers::irls;
use crate::solvers::{FitConfig, WlsSolver};
use crate::summary;

/// A generalized linear model: response, family, link, and design matrix.
pub struct Glm {
    resp: ResponseState,
    solver: WlsSolver,
    fitted: bool,
    iterations: usize,
}

impl std::fmt::Debug for Glm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Glm")
            .field("resp", &self.resp)
            .field("fitted", &self.fitted)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl Glm {
    /// Build a model from a response vector, design matrix, family, and link.
    ///
    /// The design matrix should already contain an intercept column if one is
    /// wanted. Fails on shape mismatches and on response values outside the
    /// family's support.
    pub fn new(
        y: Array1<f64>,
        x: Array2<f64>,
        family: Box<dyn Family>,
        link: Box<dyn Link>,
    ) -> Result<Self> {
        if y.is_empty() {
            return Err(GlimError::EmptyInput("y is empty".to_string()));
        }
        if x.ncols() == 0 {
            return Err(GlimError::EmptyInput("X has no columns".to_string()));
        }
        if x.nrows() != y.len() {
            return Err(GlimError::DimensionMismatch(format!(
                "X has {} rows but y has {} elements",
                x.nrows(),
                y.len()
            )));
        }
        let resp = ResponseState::new(y, family, link, Array1::zeros(0), Array1::zeros(0))?;
        Ok(Self {
            resp,
            solver: WlsSolver::new(x),
            fitted: false,
            iterations: 0,
        })
    }

    /// Build a model from family/link name strings, using the family's
    /// default link when none is given.
    pub fn from_names(
        y: Array1<f64>,
        x: Array2<f64>,
        family: &str,
        link: Option<&str>,
    ) -> Result<Self> {
        let family = family_from_name(family)?;
        let link = match link {
            Some(name) => link_from_name(name)?,
            None => family.default_link(),
        };
        Self::new(y, x, family, link)
    }

    /// Add an offset to the linear predictor (e.g. log exposure for rate
    /// models). Must be set before fitting.
    pub fn with_offset(mut self, offset: Array1<f64>) -> Result<Self> {
        if self.fitted {
            return Err(GlimError::InvalidValue(
                "offset must be set before fitting".to_string(),
            ));
        }
        self.resp.set_offset(offset)?;
        Ok(self)
    }

    /// Add prior observation weights (grouped-data counts, exposure, known
    /// precision). Must be set before fitting.
    pub fn with_weights(mut self, weights: Array1<f64>) -> Result<Self> {
        if self.fitted {
            return Err(GlimError::InvalidValue(
                "weights must be set before fitting".to_string(),
            ));
        }
        self.resp.set_prior_weights(weights)?;
        Ok(self)
    }

    // =========================================================================
    // Fitting
    // =========================================================================

    /// Fit the model by IRLS.
    ///
    /// Idempotent: fitting an already-fitted model is a no-op. On error the
    /// model stays unfit and keeps whatever state the last committed
    /// iteration produced.
    pub fn fit(&mut self, config: &FitConfig) -> Result<()> {
        config.validate()?;
        if self.fitted {
            return Ok(());
        }
        self.iterations = irls::run(&mut self.resp, &mut self.solver, config)?;
        self.fitted = true;
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Committed IRLS iterations of the successful fit.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn require_fitted(&self) -> Result<()> {
        if self.fitted {
            Ok(())
        } else {
            Err(GlimError::ModelNotFitted)
        }
    }

    // =========================================================================
    // State accessors (available on unfit models for partial-state inspection)
    // =========================================================================

    /// Current coefficient estimates.
    pub fn coefficients(&self) -> &Array1<f64> {
        self.solver.coefficients()
    }

    /// Fitted means mu.
    pub fn fitted_values(&self) -> &Array1<f64> {
        self.resp.mu()
    }

    /// Linear predictor eta (offset included).
    pub fn linear_predictor(&self) -> &Array1<f64> {
        self.resp.eta()
    }

    /// Current deviance: the prior-weighted sum of squared deviance
    /// residuals.
    pub fn deviance(&self) -> f64 {
        self.resp.deviance()
    }

    /// Log-likelihood at the current fit, with the dispersion estimated as
    /// deviance over total prior weight.
    pub fn log_likelihood(&self) -> f64 {
        self.resp.log_likelihood()
    }

    pub fn num_obs(&self) -> usize {
        self.resp.num_obs()
    }

    pub fn num_coefficients(&self) -> usize {
        self.solver.num_coefficients()
    }

    /// Residual degrees of freedom: total prior weight minus the number of
    /// coefficients.
    pub fn df_residual(&self) -> f64 {
        self.resp.total_prior_weight() - self.solver.num_coefficients() as f64
    }

    /// Number of estimated parameters: coefficients, plus one if the family
    /// carries a free dispersion parameter.
    pub fn dof(&self) -> usize {
        self.solver.num_coefficients() + usize::from(self.resp.family().has_dispersion())
    }

    pub fn family(&self) -> &dyn Family {
        self.resp.family()
    }

    pub fn link(&self) -> &dyn Link {
        self.resp.link()
    }

    // =========================================================================
    // Derived quantities
    // =========================================================================

    /// The dispersion estimate: sum of working-weighted squared working
    /// residuals over residual degrees of freedom for families with a free
    /// dispersion parameter, exactly 1 otherwise. Returns the standard-
    /// deviation scale by default, the variance scale when `squared`.
    pub fn dispersion(&self, squared: bool) -> f64 {
        if !self.resp.family().has_dispersion() {
            return 1.0;
        }
        let s = self
            .resp
            .working_weights()
            .iter()
            .zip(self.resp.working_residuals())
            .map(|(w, r)| w * r * r)
            .sum::<f64>()
            / self.df_residual();
        if squared {
            s
        } else {
            s.sqrt()
        }
    }

    /// Akaike information criterion of the fitted model.
    pub fn aic(&self) -> Result<f64> {
        self.require_fitted()?;
        Ok(model_fit::aic(self.log_likelihood(), self.dof()))
    }

    /// Bayesian information criterion of the fitted model.
    pub fn bic(&self) -> Result<f64> {
        self.require_fitted()?;
        Ok(model_fit::bic(
            self.log_likelihood(),
            self.dof(),
            self.resp.total_prior_weight(),
        ))
    }

    /// Deviance of the intercept-only comparison fit at the prior-weighted
    /// mean response.
    pub fn null_deviance(&self) -> f64 {
        model_fit::null_deviance(self.resp.y(), self.resp.prior_weights(), self.resp.family())
    }

    /// (X'WX)^-1 at the final working weights.
    pub fn unscaled_covariance(&self) -> Result<Array2<f64>> {
        self.require_fitted()?;
        self.solver.unscaled_covariance()
    }

    /// Standard errors: sqrt of dispersion(squared) times the covariance
    /// diagonal.
    pub fn std_errors(&self) -> Result<Array1<f64>> {
        let cov = self.unscaled_covariance()?;
        let scale = self.dispersion(true);
        Ok(Array1::from_shape_fn(cov.nrows(), |j| {
            (scale * cov[[j, j]]).sqrt()
        }))
    }

    /// Coefficient test statistics beta / se.
    pub fn test_statistics(&self) -> Result<Array1<f64>> {
        let se = self.std_errors()?;
        Ok(self.coefficients() / &se)
    }

    /// Two-tailed p-values: t-based for families with estimated dispersion,
    /// z-based otherwise.
    pub fn p_values(&self) -> Result<Array1<f64>> {
        let stats = self.test_statistics()?;
        if self.resp.family().has_dispersion() {
            let df = self.df_residual();
            Ok(stats.mapv(|t| pvalue_t(t, df)))
        } else {
            Ok(stats.mapv(pvalue_z))
        }
    }

    /// Confidence intervals at the given level, one (lower, upper) row per
    /// coefficient.
    pub fn conf_int(&self, level: f64) -> Result<Array2<f64>> {
        let se = self.std_errors()?;
        let beta = self.coefficients();
        let use_t = self.resp.family().has_dispersion();
        let df = self.df_residual();
        let mut out = Array2::zeros((beta.len(), 2));
        for j in 0..beta.len() {
            let (lower, upper) = if use_t {
                confidence_interval_t(beta[j], se[j], df, level)
            } else {
                confidence_interval_z(beta[j], se[j], level)
            };
            out[[j, 0]] = lower;
            out[[j, 1]] = upper;
        }
        Ok(out)
    }

    // =========================================================================
    // Residuals
    // =========================================================================

    /// Raw residuals y - mu.
    pub fn resid_response(&self) -> Array1<f64> {
        residuals::resid_response(self.resp.y(), self.resp.mu())
    }

    /// Pearson residuals, prior-weighted.
    pub fn resid_pearson(&self) -> Array1<f64> {
        residuals::resid_pearson(
            self.resp.y(),
            self.resp.mu(),
            self.resp.family(),
            self.resp.prior_weights(),
        )
    }

    /// Deviance residuals, prior-weighted.
    pub fn resid_deviance(&self) -> Array1<f64> {
        residuals::resid_deviance(
            self.resp.y(),
            self.resp.mu(),
            self.resp.family(),
            self.resp.prior_weights(),
        )
    }

    /// Working residuals from the last IRLS update.
    pub fn resid_working(&self) -> Array1<f64> {
        self.resp.working_residuals().clone()
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Linear predictor for new data: X_new * beta, plus the offset when the
    /// model was fitted with one. An offset is required exactly when the
    /// fitted model used one, and rejected otherwise.
    pub fn predict_linear(
        &self,
        x_new: &Array2<f64>,
        offset: Option<&Array1<f64>>,
    ) -> Result<Array1<f64>> {
        self.require_fitted()?;
        if x_new.ncols() != self.solver.num_coefficients() {
            return Err(GlimError::DimensionMismatch(format!(
                "new design matrix has {} columns but the model has {} coefficients",
                x_new.ncols(),
                self.solver.num_coefficients()
            )));
        }
        match (self.resp.has_offset(), offset) {
            (true, None) => Err(GlimError::InvalidValue(
                "the model was fitted with an offset; predict requires one".to_string(),
            )),
            (false, Some(_)) => Err(GlimError::InvalidValue(
                "the model was fitted without an offset; predict must not receive one".to_string(),
            )),
            (_, maybe_offset) => {
                let mut eta = x_new.dot(self.solver.coefficients());
                if let Some(off) = maybe_offset {
                    if off.len() != x_new.nrows() {
                        return Err(GlimError::DimensionMismatch(format!(
                            "offset has {} elements but the new design matrix has {} rows",
                            off.len(),
                            x_new.nrows()
                        )));
                    }
                    eta += off;
                }
                Ok(eta)
            }
        }
    }

    /// Expected response for new data: the inverse link applied to
    /// `predict_linear`.
    pub fn predict(
        &self,
        x_new: &Array2<f64>,
        offset: Option<&Array1<f64>>,
    ) -> Result<Array1<f64>> {
        let eta = self.predict_linear(x_new, offset)?;
        Ok(eta.mapv(|e| self.resp.link().inverse(e)))
    }

    /// Formatted coefficient table with fit statistics.
    pub fn summary(&self) -> Result<String> {
        self.require_fitted()?;
        summary::coefficient_table(self)
    }

    /// Dispersion estimate from the Pearson chi-squared statistic.
    pub fn dispersion_pearson(&self) -> f64 {
        disp::estimate_dispersion_pearson(
            self.resp.y(),
            self.resp.mu(),
            self.resp.family(),
            self.resp.prior_weights(),
            self.df_residual(),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::{BernoulliFamily, GammaFamily, GaussianFamily, PoissonFamily};
    use crate::links::{IdentityLink, LogLink, LogitLink};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn intercept_only(n: usize) -> Array2<f64> {
        Array2::ones((n, 1))
    }

    fn gaussian_mean_model() -> Glm {
        Glm::new(
            array![1.0, 2.0, 3.0, 4.0, 5.0],
            intercept_only(5),
            Box::new(GaussianFamily),
            Box::new(IdentityLink),
        )
        .unwrap()
    }

    #[test]
    fn test_gaussian_intercept_scenario() {
        // exact linear model: one committed iteration, coefficient is the
        // mean, deviance is the sum of squares around it
        let mut model = gaussian_mean_model();
        model.fit(&FitConfig::default()).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.iterations(), 1);
        assert_abs_diff_eq!(model.coefficients()[0], 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(model.deviance(), 10.0, epsilon = 1e-10);
    }

    #[test]
    fn test_fit_is_idempotent() {
        let mut model = gaussian_mean_model();
        model.fit(&FitConfig::default()).unwrap();
        let coef = model.coefficients().clone();
        let iterations = model.iterations();
        model.fit(&FitConfig::default()).unwrap();
        assert_eq!(model.coefficients(), &coef);
        assert_eq!(model.iterations(), iterations);
        assert!(model.is_fitted());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = Glm::new(
            array![1.0, 2.0],
            intercept_only(3),
            Box::new(GaussianFamily),
            Box::new(IdentityLink),
        )
        .unwrap_err();
        assert!(matches!(err, GlimError::DimensionMismatch(_)));
    }

    #[test]
    fn test_support_violation_rejected() {
        let err = Glm::new(
            array![0.0, 1.0, 1.5],
            intercept_only(3),
            Box::new(BernoulliFamily),
            Box::new(LogitLink),
        )
        .unwrap_err();
        assert!(matches!(err, GlimError::UnsupportedResponse(_)));
    }

    #[test]
    fn test_non_convergence_leaves_model_unfit() {
        let mut model = Glm::new(
            array![1.0, 3.0],
            intercept_only(2),
            Box::new(PoissonFamily),
            Box::new(LogLink),
        )
        .unwrap();
        let config = FitConfig {
            max_iterations: 1,
            tolerance: 1e-12,
            ..FitConfig::default()
        };
        let err = model.fit(&config).unwrap_err();
        assert!(matches!(err, GlimError::DidNotConverge { .. }));
        assert!(!model.is_fitted());
        // partial state is still inspectable
        assert!(model.deviance().is_finite());
        // and inferential quantities are refused
        assert!(matches!(model.std_errors(), Err(GlimError::ModelNotFitted)));
    }

    #[test]
    fn test_invalid_config_rejected_before_iteration() {
        let mut model = gaussian_mean_model();
        let config = FitConfig {
            min_step_fraction: 0.0,
            ..FitConfig::default()
        };
        assert!(matches!(
            model.fit(&config),
            Err(GlimError::InvalidConfiguration(_))
        ));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_weighted_mean_via_prior_weights() {
        let mut model = Glm::new(
            array![1.0, 2.0, 3.0, 4.0, 5.0],
            intercept_only(5),
            Box::new(GaussianFamily),
            Box::new(IdentityLink),
        )
        .unwrap()
        .with_weights(array![1.0, 1.0, 1.0, 1.0, 10.0])
        .unwrap();
        model.fit(&FitConfig::default()).unwrap();
        // weighted mean (1+2+3+4+50)/14
        assert_abs_diff_eq!(model.coefficients()[0], 60.0 / 14.0, epsilon = 1e-8);
    }

    #[test]
    fn test_poisson_offset_rate_model() {
        // with log exposure as offset, an intercept-only fit recovers the
        // common rate: sum(y) / sum(exposure)
        let exposure = array![1.0, 2.0, 4.0];
        let y = array![1.0, 2.0, 4.0];
        let mut model = Glm::new(
            y,
            intercept_only(3),
            Box::new(PoissonFamily),
            Box::new(LogLink),
        )
        .unwrap()
        .with_offset(exposure.mapv(f64::ln))
        .unwrap();
        model.fit(&FitConfig::default()).unwrap();
        assert_abs_diff_eq!(model.coefficients()[0], 0.0, epsilon = 1e-6);

        // predict demands the offset the model was fitted with
        let x_new = intercept_only(2);
        assert!(matches!(
            model.predict(&x_new, None),
            Err(GlimError::InvalidValue(_))
        ));
        let mu = model
            .predict(&x_new, Some(&array![0.0, (10.0_f64).ln()]))
            .unwrap();
        assert_abs_diff_eq!(mu[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(mu[1], 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_predict_rejects_unexpected_offset() {
        let mut model = gaussian_mean_model();
        model.fit(&FitConfig::default()).unwrap();
        let err = model
            .predict(&intercept_only(2), Some(&array![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, GlimError::InvalidValue(_)));
    }

    #[test]
    fn test_predict_matches_fitted_values() {
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let x = Array2::from_shape_fn((6, 2), |(i, j)| if j == 0 { 1.0 } else { i as f64 });
        let mut model =
            Glm::new(y, x.clone(), Box::new(BernoulliFamily), Box::new(LogitLink)).unwrap();
        model.fit(&FitConfig::default()).unwrap();
        let mu = model.predict(&x, None).unwrap();
        for (p, f) in mu.iter().zip(model.fitted_values()) {
            assert_abs_diff_eq!(*p, *f, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_gaussian_dispersion_and_standard_errors() {
        let mut model = gaussian_mean_model();
        model.fit(&FitConfig::default()).unwrap();
        // dispersion (variance scale) = SSE / (n - p) = 10 / 4
        assert_abs_diff_eq!(model.dispersion(true), 2.5, epsilon = 1e-10);
        // se of the mean = sqrt(s^2 / n)
        let se = model.std_errors().unwrap();
        assert_abs_diff_eq!(se[0], (2.5_f64 / 5.0).sqrt(), epsilon = 1e-10);
        assert_eq!(model.dof(), 2);
    }

    #[test]
    fn test_fixed_dispersion_families_report_unity() {
        let mut model = Glm::new(
            array![1.0, 2.0, 3.0],
            intercept_only(3),
            Box::new(PoissonFamily),
            Box::new(LogLink),
        )
        .unwrap();
        model.fit(&FitConfig::default()).unwrap();
        assert_eq!(model.dispersion(false), 1.0);
        assert_eq!(model.dispersion(true), 1.0);
        assert_eq!(model.dof(), 1);
    }

    #[test]
    fn test_gamma_intercept_recovers_mean() {
        let mut model = Glm::new(
            array![1.0, 2.0, 3.0, 4.0, 5.0],
            intercept_only(5),
            Box::new(GammaFamily),
            Box::new(LogLink),
        )
        .unwrap();
        model.fit(&FitConfig::default()).unwrap();
        assert_abs_diff_eq!(model.coefficients()[0], 3.0_f64.ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_from_names_uses_default_link() {
        let mut model = Glm::from_names(
            array![1.0, 2.0, 3.0],
            intercept_only(3),
            "poisson",
            None,
        )
        .unwrap();
        assert_eq!(model.family().name(), "Poisson");
        assert_eq!(model.link().name(), "Log");
        model.fit(&FitConfig::default()).unwrap();
        assert_abs_diff_eq!(model.coefficients()[0], 2.0_f64.ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_null_deviance_at_least_model_deviance() {
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let x = Array2::from_shape_fn((6, 2), |(i, j)| if j == 0 { 1.0 } else { i as f64 });
        let mut model = Glm::new(y, x, Box::new(BernoulliFamily), Box::new(LogitLink)).unwrap();
        model.fit(&FitConfig::default()).unwrap();
        assert!(model.null_deviance() >= model.deviance() - 1e-10);
    }
}
