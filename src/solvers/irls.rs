// =============================================================================
// IRLS: Iteratively Reweighted Least Squares with Step-Halving
// =============================================================================
//
// Each iteration linearizes the likelihood around the current fit, asks the
// weighted least-squares solver for a coefficient delta, and then decides how
// much of that delta to take:
//
//     delta <- solve(X'WX d = X'W r)        r = working residual
//     f = 1
//     while deviance(beta + f * delta) > previous deviance:
//         f <- f / 2                        (fail below min_step_fraction)
//     commit f * delta
//
// The raw Newton-type step is not globally convergent for non-quadratic
// links; backtracking on the step fraction makes every COMMITTED iteration
// non-increasing in deviance, which is the invariant the convergence test
// relies on. A trial step that pushes the mean out of the link's domain is
// scored as infinite deviance and backtracked the same way - it is never an
// error at this level.
//
// Convergence is declared when the relative improvement
// (dev_prev - dev) / dev drops below the tolerance, or the deviance reaches
// exactly zero (a saturated fit, where the relative criterion is undefined).
//
// =============================================================================

use ndarray::Array1;

use crate::error::{GlimError, Result};
use crate::response::ResponseState;
use crate::solvers::wls::WlsSolver;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration options for one fit call.
///
/// The defaults are sensible for most problems; difficult fits usually want a
/// larger `max_iterations` or a warm start, not a different tolerance.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Maximum number of committed IRLS iterations before giving up.
    /// Default: 30
    pub max_iterations: usize,

    /// Smallest step fraction step-halving may reach; at or below this the
    /// fit fails with `StepHalvingExhausted`. Must lie in (0, 1).
    /// Default: 1e-3
    pub min_step_fraction: f64,

    /// Convergence tolerance for the relative deviance improvement.
    /// Default: 1e-6
    pub tolerance: f64,

    /// Print a progress line per committed iteration.
    /// Default: false
    pub verbose: bool,

    /// Start from these coefficients instead of the family's initial-mean
    /// heuristic.
    pub warm_start: Option<Array1<f64>>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            min_step_fraction: 1e-3,
            tolerance: 1e-6,
            verbose: false,
            warm_start: None,
        }
    }
}

impl FitConfig {
    /// Reject out-of-range parameters before any iteration runs.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations < 1 {
            return Err(GlimError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.min_step_fraction > 0.0 && self.min_step_fraction < 1.0) {
            return Err(GlimError::InvalidConfiguration(format!(
                "min_step_fraction must lie in (0, 1), got {}",
                self.min_step_fraction
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(GlimError::InvalidConfiguration(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Deviance of the trial linear predictor at the given step fraction.
///
/// A `DomainFailure` from the response update is mapped to +infinity here -
/// the step-halving loop treats "left the domain" exactly like "got worse".
/// Any other error propagates.
fn trial_deviance(resp: &mut ResponseState, solver: &WlsSolver, step: f64) -> Result<f64> {
    let eta = solver.trial_linear_predictor(step);
    match resp.update_linear_predictor(&eta) {
        Ok(()) => Ok(resp.deviance()),
        Err(GlimError::DomainFailure) => Ok(f64::INFINITY),
        Err(other) => Err(other),
    }
}

/// Run the IRLS loop to convergence. Returns the number of committed
/// iterations. The caller is responsible for validating `config` first.
pub(crate) fn run(
    resp: &mut ResponseState,
    solver: &mut WlsSolver,
    config: &FitConfig,
) -> Result<usize> {
    // ------------------------------------------------------------------
    // Initialization: either solve for a first working fit from the
    // initial-mean seed, or adopt the warm-start coefficients as-is.
    // ------------------------------------------------------------------
    match &config.warm_start {
        Some(start) => {
            solver.set_coefficients(start)?;
            let eta = solver.trial_linear_predictor(0.0);
            resp.update_linear_predictor(&eta)?;
        }
        None => {
            let z = resp.working_response();
            solver.compute_delta(&z, resp.working_weights())?;
            let eta = solver.trial_linear_predictor(1.0);
            resp.update_linear_predictor(&eta)?;
            solver.commit(1.0);
        }
    }
    let mut deviance_prev = resp.deviance();
    log::debug!("irls start: deviance = {deviance_prev:.6e}");

    for iteration in 1..=config.max_iterations {
        // one Newton-type delta from the current linearization
        solver.compute_delta(resp.working_residuals(), resp.working_weights())?;

        // backtrack the step fraction until the deviance stops increasing
        let mut step = 1.0_f64;
        let mut deviance = trial_deviance(resp, solver, step)?;
        while deviance > deviance_prev {
            step *= 0.5;
            if step <= config.min_step_fraction {
                log::debug!(
                    "irls iteration {iteration}: step-halving exhausted at step {step:.3e}"
                );
                return Err(GlimError::StepHalvingExhausted {
                    step,
                    deviance: deviance_prev,
                });
            }
            deviance = trial_deviance(resp, solver, step)?;
        }
        solver.commit(step);

        let crit = (deviance_prev - deviance) / deviance;
        if config.verbose {
            eprintln!(
                "Iteration {}: deviance = {:.6}, step = {}, crit = {:.2e}",
                iteration, deviance, step, crit
            );
        }
        log::debug!(
            "irls iteration {iteration}: deviance = {deviance:.6e}, step = {step}, crit = {crit:.2e}"
        );

        if crit < config.tolerance || deviance == 0.0 {
            return Ok(iteration);
        }
        // committed steps are monotone, so a non-finite criterion here means
        // the state itself is corrupt, not a recoverable fit problem
        assert!(
            crit.is_finite(),
            "non-finite convergence criterion: deviance {} after {}",
            deviance,
            deviance_prev
        );
        deviance_prev = deviance;
    }

    Err(GlimError::DidNotConverge {
        iterations: config.max_iterations,
    })
}

// =============================================================================
// Tests
// =============================================================================
