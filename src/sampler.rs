//! Gillespie event sampling: how long until the next infection, and in which cohort.

use crate::cohort::{Cohort, CohortCounts};
use crate::propensity::{Propensities, PropensityModel};

/// Inverse-CDF draw of an exponential waiting time with rate `total_rate` from a uniform
/// `r1` in (0, 1). Not finite when the rate underflows.
#[inline]
#[must_use]
pub fn waiting_time(total_rate: f64, r1: f64) -> f64 {
    -r1.ln() / total_rate
}

/// Picks the cohort whose slice of `[0, 1)` contains `r2`. The slices are laid out in
/// `model.cohorts()` order, each as wide as the cohort's share of the total rate.
///
/// Once `r2` is past the `Control` slice the model's [`forced_cohort`] takes precedence over
/// the remaining slices. If rounding leaves `r2` beyond the last boundary, the last cohort that
/// still has members and a positive rate is chosen.
///
/// [`forced_cohort`]: PropensityModel::forced_cohort
pub fn select_cohort<M: PropensityModel + ?Sized>(
    model: &M,
    counts: &CohortCounts,
    propensities: &Propensities,
    r2: f64,
) -> Cohort {
    let total = propensities.total();
    let order = model.cohorts();
    let mut boundary = 0.0;

    for (position, &cohort) in order.iter().enumerate() {
        boundary += propensities.rate(cohort) / total;
        if r2 < boundary {
            return cohort;
        }
        if position == 0 {
            if let Some(forced) = model.forced_cohort(counts) {
                return forced;
            }
        }
    }

    order
        .iter()
        .rev()
        .copied()
        .find(|&cohort| counts.get(cohort) > 0 && propensities.rate(cohort) > 0.0)
        .unwrap_or(order[0])
}
