// =============================================================================
// Numerical Constants
// =============================================================================
//
// Guard values shared by the link functions. Centralized so the clamping
// behavior is consistent across links and visible in one place.
//
// =============================================================================

/// Largest argument passed to `exp()`. `exp(709.8)` overflows an `f64`;
/// clamping here keeps log-link means finite for any real linear predictor.
pub const MAX_EXP_ARG: f64 = 709.0;

/// Floor for the mean derivative of saturating unit-interval links
/// (probit, cloglog, cauchit). At extreme linear predictors the true
/// derivative underflows to zero, which would turn the working residual
/// into 0/0; the floor keeps it a large-but-finite value instead.
pub const MU_ETA_MIN: f64 = f64::MIN_POSITIVE;
