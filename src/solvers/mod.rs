// =============================================================================
// Solvers
// =============================================================================
//
// Two collaborators make up a fit:
//
//   - `wls`: the weighted least-squares coefficient solver. Owns the design
//     matrix and committed coefficients, and answers "what delta does the
//     current linearization suggest" plus trial evaluations at fractional
//     step sizes.
//   - `irls`: the outer iteration. Owns nothing; drives a `ResponseState`
//     and a `WlsSolver` until the deviance stops improving.
//
// =============================================================================

pub mod irls;
pub mod wls;

pub use irls::FitConfig;
pub use wls::WlsSolver;
