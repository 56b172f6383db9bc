// =============================================================================
// glim: Generalized Linear Models by IRLS
// =============================================================================
//
// Fits generalized linear models: given a design matrix, a response vector,
// a distribution family, and a link function, estimate coefficients by
// iteratively reweighted least squares with step-halving, then expose the
// derived quantities (deviance, log-likelihood, dispersion, standard errors,
// confidence intervals, predictions).
//
// STRUCTURE:
// ----------
//   - links:       link functions (Identity, Log, Logit, Probit, ...)
//   - families:    distribution families (Gaussian, Bernoulli, Binomial,
//                  Poisson, Gamma)
//   - response:    per-model mutable state driven by the IRLS update rule
//   - solvers:     the weighted least-squares step and the IRLS driver
//   - model:       the `Glm` model object and its derived quantities
//   - inference:   p-values, confidence intervals, significance codes
//   - diagnostics: residuals, dispersion estimates, AIC/BIC
//   - summary:     coefficient-table formatting
//   - error:       error types used throughout the crate
//
// EXAMPLE:
// --------
//   let mut model = Glm::from_names(y, x, "poisson", None)?;
//   model.fit(&FitConfig::default())?;
//   println!("{}", model.summary()?);
//
// =============================================================================

pub mod constants;
mod convert;
pub mod diagnostics;
pub mod error;
pub mod families;
pub mod inference;
pub mod links;
pub mod model;
pub mod response;
pub mod solvers;
pub mod summary;

pub use error::{GlimError, Result};
pub use families::{
    family_from_name, is_canonical_pair, BernoulliFamily, BinomialFamily, Family, GammaFamily,
    GaussianFamily, PoissonFamily,
};
pub use inference::{
    confidence_interval_t, confidence_interval_z, pvalue_t, pvalue_z, significance_stars,
};
pub use links::{
    link_from_name, CauchitLink, CloglogLink, IdentityLink, InverseLink, Link, LinkEval, LogLink,
    LogitLink, ProbitLink, SqrtLink,
};
pub use model::Glm;
pub use response::ResponseState;
pub use solvers::{FitConfig, WlsSolver};
