// =============================================================================
// Error Types
// =============================================================================
//
// Every fallible operation in this crate returns `Result<T>` with a typed
// error. The variants split into three groups that callers treat differently:
//
//   CONSTRUCTION: DimensionMismatch, EmptyInput, UnsupportedResponse,
//     InvalidValue - raised before a model exists; nothing to inspect.
//
//   FIT TIME: InvalidConfiguration, StepHalvingExhausted, DidNotConverge,
//     LinearAlgebraError - the model stays constructed but unfit, so callers
//     can inspect its state and retry with different settings or a warm start.
//
//   INTERNAL: DomainFailure - a trial linear predictor pushed the mean out of
//     the link's domain. The IRLS driver converts this to an infinite trial
//     deviance and backtracks; it only escapes to the caller if the *initial*
//     state is already invalid.
//
// =============================================================================

use thiserror::Error;

/// Errors produced while constructing or fitting a GLM.
#[derive(Debug, Clone, Error)]
pub enum GlimError {
    /// Row or length mismatch among the design matrix, response, weights,
    /// or offset.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A required input has zero rows or columns.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A response value lies outside the support of the chosen family.
    #[error("response out of support: {0}")]
    UnsupportedResponse(String),

    /// An input value is invalid for reasons other than shape or support
    /// (negative weights, unknown family/link name, offset misuse in predict).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A fit parameter is out of range (`max_iterations`, `min_step_fraction`).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A mean/weight update produced a non-finite value. Recovered internally
    /// by the IRLS driver as an infinite trial deviance.
    #[error("linear predictor update left the link domain")]
    DomainFailure,

    /// Step-halving reached the minimum step fraction without improving the
    /// deviance. The fit is aborted and the model left unfit.
    #[error(
        "step-halving failed: step fraction {step:.3e} reached without improving deviance {deviance:.6e}"
    )]
    StepHalvingExhausted { step: f64, deviance: f64 },

    /// The iteration budget ran out before the convergence criterion was met.
    #[error("IRLS did not converge in {iterations} iterations")]
    DidNotConverge { iterations: usize },

    /// The weighted normal equations could not be solved.
    #[error("linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// A quantity that requires a converged fit was requested from an unfit
    /// model.
    #[error("model has not been fitted")]
    ModelNotFitted,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GlimError>;
