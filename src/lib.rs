//! Stochastic simulation of vaccine trials.
//!
//! A closed population is split into an unvaccinated (control) arm and a vaccinated arm, and
//! infections are drawn one at a time with the Gillespie algorithm until a fixed step budget is
//! used up. How efficacy protects a vaccinee is pluggable through
//! [`PropensityModel`](propensity::PropensityModel):
//! * [`AllOrNothing`](propensity::AllOrNothing): a fraction `eps` of vaccinees is fully immune.
//! * [`Leaky`](propensity::Leaky): every vaccinee is infected at `1 - eps` times the base rate.
//! * [`Intermediate`](propensity::Intermediate): a two-point mixture with mean efficacy `eps`
//!   and variance `var`.
//!
//! [`sweep::run_sweep`] walks the efficacy (and variance) grid, running the configured number
//! of replicates at each point and passing one [`EventRecord`](event::EventRecord) per step to
//! an [`EventSink`](event::EventSink) such as the [`EventReport`](report::EventReport) file.
//! [`runner::run_with_args`] drives a whole sweep from parsed command-line arguments.

pub mod averages;
pub mod cohort;
pub mod context;
pub mod error;
pub mod event;
pub mod hashing;
pub mod log;
pub mod parameters;
pub mod propensity;
pub mod random;
pub mod report;
pub mod run;
pub mod runner;
pub mod sampler;
pub mod sweep;

#[inline(always)]
pub(crate) fn type_of<T: 'static>() -> std::any::TypeId {
    std::any::TypeId::of::<T>()
}

pub use cohort::{Cohort, CohortCounts};
pub use context::Context;
pub use error::SimError;
pub use event::{EventRecord, EventSink};
pub use parameters::{ContextParametersExt, Parameters, StreamMode};
pub use propensity::{AllOrNothing, Intermediate, Leaky, ModelKind, PropensityModel};
pub use random::{ContextRandomExt, DrawSource};
pub use report::EventReport;
pub use run::{RunConfig, SimulationRun};
pub use runner::{run_with_args, BaseArgs};
pub use sweep::{run_sweep, SweepSummary};

// Re-export for macros
pub use rand;
