// =============================================================================
// Model Diagnostics
// =============================================================================
//
// Residual definitions, dispersion estimates, and likelihood-based fit
// measures. Naming follows the statsmodels conventions (resid_response,
// resid_pearson, ...) so results line up with the usual references.
//
// Everything here is a pure function over arrays plus a `Family`; the model
// object exposes thin wrappers that pass its own state in.
//
// =============================================================================

pub mod dispersion;
pub mod model_fit;
pub mod residuals;

pub use dispersion::{estimate_dispersion_deviance, estimate_dispersion_pearson, pearson_chi2};
pub use model_fit::{aic, bic, null_deviance};
pub use residuals::{resid_deviance, resid_pearson, resid_response, resid_working};
