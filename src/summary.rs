// =============================================================================
// Coefficient Table Formatting
// =============================================================================
//
// Renders a fitted model as the familiar fixed-width regression table:
// estimate, standard error, test statistic, p-value, significance code per
// coefficient, followed by the headline fit statistics. Pure formatting -
// every number comes from the model's own accessors.
//
// =============================================================================

use std::fmt::Write as _;

use crate::error::Result;
use crate::inference::significance_stars;
use crate::model::Glm;

/// Build the coefficient table for a fitted model.
pub fn coefficient_table(model: &Glm) -> Result<String> {
    let beta = model.coefficients();
    let se = model.std_errors()?;
    let stats = model.test_statistics()?;
    let pvalues = model.p_values()?;
    let stat_label = if model.family().has_dispersion() {
        "t value"
    } else {
        "z value"
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} family, {} link, {} observations",
        model.family().name(),
        model.link().name(),
        model.num_obs()
    );
    let _ = writeln!(
        out,
        "{:<10} {:>12} {:>12} {:>10} {:>12}",
        "term", "estimate", "std error", stat_label, "p value"
    );
    for j in 0..beta.len() {
        let _ = writeln!(
            out,
            "{:<10} {:>12.6} {:>12.6} {:>10.4} {:>12.4e} {}",
            format!("x{}", j),
            beta[j],
            se[j],
            stats[j],
            pvalues[j],
            significance_stars(pvalues[j])
        );
    }
    let _ = writeln!(out, "---");
    let _ = writeln!(
        out,
        "deviance: {:.6}   log-likelihood: {:.6}   AIC: {:.4}",
        model.deviance(),
        model.log_likelihood(),
        model.aic()?
    );
    let _ = writeln!(
        out,
        "dispersion: {:.6}   iterations: {}",
        model.dispersion(true),
        model.iterations()
    );
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================
