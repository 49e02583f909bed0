/*!

Propensity models: how vaccine efficacy turns into per-cohort infection rates.

A [`PropensityModel`] names the cohorts that can be infected (in the order the event sampler
walks them), the per-capita multiplier of each, the initial split of a population of size `N`
and the number of steps a run takes. The rate of a cohort is always
`beta * multiplier * count`, so the three models only differ in those few facts:

| model          | cohorts (selection order)                | multipliers              | step budget          |
|----------------|------------------------------------------|--------------------------|----------------------|
| [`AllOrNothing`] | `Control`, `Unprotected`               | 1, 1 (`Protected`: 0)    | `round(N + N(1-eps))` |
| [`Leaky`]        | `Control`, `Leaky`                     | 1, `1 - eps`             | `2N`                 |
| [`Intermediate`] | `Control`, `MixedProtected`, `Unprotected` | 1, `1 - mu`, 1       | `2N`                 |

*/

use std::fmt::Debug;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cohort::{Cohort, CohortCounts};

/// Which vaccine efficacy model a sweep runs.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[serde(alias = "all-or-nothing")]
    #[value(alias = "all-or-nothing")]
    Aon,
    Leaky,
    #[default]
    #[value(alias = "son")]
    Intermediate,
}

impl ModelKind {
    /// Label used in output file names and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Aon => "AoN",
            ModelKind::Leaky => "Leaky",
            ModelKind::Intermediate => "Intermediate",
        }
    }

    /// Whether sweep points of this model carry an efficacy variance.
    #[must_use]
    pub fn has_variance(self) -> bool {
        self == ModelKind::Intermediate
    }
}

/// Per-cohort rates for one state, plus their sum.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Propensities {
    rates: [f64; Cohort::COUNT],
    total: f64,
}

impl Propensities {
    pub(crate) fn from_rates(rates: [f64; Cohort::COUNT], total: f64) -> Self {
        Propensities { rates, total }
    }

    #[inline]
    #[must_use]
    pub fn rate(&self, cohort: Cohort) -> f64 {
        self.rates[cohort.index()]
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }
}

pub trait PropensityModel: Debug + Sync {
    fn kind(&self) -> ModelKind;

    /// The cohorts that can be infected, in event-selection order. `Control` comes first.
    fn cohorts(&self) -> &'static [Cohort];

    /// Per-capita rate multiplier relative to an unvaccinated individual.
    fn multiplier(&self, cohort: Cohort) -> f64;

    /// The efficacy attributed to an infection drawn from `cohort`.
    fn efficacy(&self, cohort: Cohort) -> f64;

    fn initial_counts(&self, population: u32) -> CohortCounts;

    fn step_budget(&self, population: u32) -> usize;

    /// A cohort the next event must come from once the draw has missed the `Control`
    /// interval, regardless of where it fell among the remaining intervals.
    fn forced_cohort(&self, _counts: &CohortCounts) -> Option<Cohort> {
        None
    }

    fn propensities(&self, counts: &CohortCounts, beta: f64) -> Propensities {
        let mut rates = [0.0; Cohort::COUNT];
        let mut total = 0.0;
        for &cohort in self.cohorts() {
            let rate = beta * self.multiplier(cohort) * f64::from(counts.get(cohort));
            rates[cohort.index()] = rate;
            total += rate;
        }
        Propensities::from_rates(rates, total)
    }
}

/// Rounds half away from zero. The argument is always within `0..=N`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_count(value: f64) -> u32 {
    value.round() as u32
}

/// A fraction `1 - eps` of vaccinees is fully susceptible; the rest can never be infected.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AllOrNothing {
    pub eps: f64,
}

impl AllOrNothing {
    #[must_use]
    pub fn new(eps: f64) -> Self {
        AllOrNothing { eps }
    }
}

impl PropensityModel for AllOrNothing {
    fn kind(&self) -> ModelKind {
        ModelKind::Aon
    }

    fn cohorts(&self) -> &'static [Cohort] {
        &[Cohort::Control, Cohort::Unprotected]
    }

    fn multiplier(&self, cohort: Cohort) -> f64 {
        match cohort {
            Cohort::Control | Cohort::Unprotected => 1.0,
            _ => 0.0,
        }
    }

    fn efficacy(&self, cohort: Cohort) -> f64 {
        match cohort {
            Cohort::Protected => 1.0,
            _ => 0.0,
        }
    }

    fn initial_counts(&self, population: u32) -> CohortCounts {
        let unprotected = round_count(f64::from(population) * (1.0 - self.eps));
        CohortCounts::new()
            .with(Cohort::Control, population)
            .with(Cohort::Unprotected, unprotected)
            .with(Cohort::Protected, population - unprotected)
    }

    // Protected vaccinees never produce an event, so the budget shrinks with efficacy.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn step_budget(&self, population: u32) -> usize {
        let n = f64::from(population);
        (n + n * (1.0 - self.eps)).round() as usize
    }
}

/// Every vaccinee has its susceptibility reduced by the factor `1 - eps`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Leaky {
    pub eps: f64,
}

impl Leaky {
    #[must_use]
    pub fn new(eps: f64) -> Self {
        Leaky { eps }
    }
}

impl PropensityModel for Leaky {
    fn kind(&self) -> ModelKind {
        ModelKind::Leaky
    }

    fn cohorts(&self) -> &'static [Cohort] {
        &[Cohort::Control, Cohort::Leaky]
    }

    fn multiplier(&self, cohort: Cohort) -> f64 {
        match cohort {
            Cohort::Control => 1.0,
            Cohort::Leaky => 1.0 - self.eps,
            _ => 0.0,
        }
    }

    fn efficacy(&self, cohort: Cohort) -> f64 {
        match cohort {
            Cohort::Control => 0.0,
            _ => self.eps,
        }
    }

    fn initial_counts(&self, population: u32) -> CohortCounts {
        CohortCounts::new()
            .with(Cohort::Control, population)
            .with(Cohort::Leaky, population)
    }

    fn step_budget(&self, population: u32) -> usize {
        2 * population as usize
    }
}

/// Fits a two-point efficacy distribution (`mu` with probability `p`, `0` otherwise) to the
/// mean `eps` and variance `var`, returning `(p, mu)`.
///
/// Matching moments gives `p * mu = eps` and `p * mu^2 - eps^2 = var`, hence
/// `p = eps^2 / (var + eps^2)` and `mu = eps / p`. The degenerate point `eps = var = 0` maps to
/// `(0, 0)`.
#[must_use]
pub fn mixture_fit(eps: f64, var: f64) -> (f64, f64) {
    if eps == 0.0 && var == 0.0 {
        return (0.0, 0.0);
    }
    let p = eps * eps / (var + eps * eps);
    (p, eps / p)
}

/// A fraction `p` of vaccinees is protected with efficacy `mu`; the rest are unprotected.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Intermediate {
    pub eps: f64,
    pub var: f64,
    pub p: f64,
    pub mu: f64,
}

impl Intermediate {
    #[must_use]
    pub fn new(eps: f64, var: f64) -> Self {
        let (p, mu) = mixture_fit(eps, var);
        Intermediate { eps, var, p, mu }
    }
}

impl PropensityModel for Intermediate {
    fn kind(&self) -> ModelKind {
        ModelKind::Intermediate
    }

    fn cohorts(&self) -> &'static [Cohort] {
        &[Cohort::Control, Cohort::MixedProtected, Cohort::Unprotected]
    }

    fn multiplier(&self, cohort: Cohort) -> f64 {
        match cohort {
            Cohort::Control | Cohort::Unprotected => 1.0,
            // `mu` can overshoot 1 by an ulp at the top of the variance range.
            Cohort::MixedProtected => (1.0 - self.mu).max(0.0),
            _ => 0.0,
        }
    }

    fn efficacy(&self, cohort: Cohort) -> f64 {
        match cohort {
            Cohort::MixedProtected => self.mu,
            _ => 0.0,
        }
    }

    fn initial_counts(&self, population: u32) -> CohortCounts {
        let mixed = round_count(f64::from(population) * self.p);
        CohortCounts::new()
            .with(Cohort::Control, population)
            .with(Cohort::MixedProtected, mixed)
            .with(Cohort::Unprotected, population - mixed)
    }

    fn step_budget(&self, population: u32) -> usize {
        2 * population as usize
    }

    // With no unprotected vaccinees left, the mixed interval can be narrower than rounding
    // error; route every non-control event to it.
    fn forced_cohort(&self, counts: &CohortCounts) -> Option<Cohort> {
        if counts.get(Cohort::MixedProtected) != 0 && counts.get(Cohort::Unprotected) == 0 {
            Some(Cohort::MixedProtected)
        } else {
            None
        }
    }
}
