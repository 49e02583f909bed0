/*!

A single replicate: the Gillespie loop over a fixed number of steps.

Each step either fires one infection or, once the total rate has dropped below the tolerance,
pads the series by copying the state forward. Every replicate therefore takes exactly
`step_budget` steps and emits exactly that many records, whenever its epidemic burns out.

*/

use log::trace;

use crate::cohort::{Cohort, CohortCounts};
use crate::error::SimError;
use crate::event::{EventRecord, EventSink};
use crate::propensity::PropensityModel;
use crate::random::DrawSource;
use crate::sampler::{select_cohort, waiting_time};

/// Engine settings shared by every run of a sweep.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RunConfig {
    pub population: u32,
    pub beta: f64,
    /// Total rates below this count as an exhausted pool.
    pub tolerance: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            population: 1000,
            beta: 0.5,
            tolerance: 1e-9,
        }
    }
}

/// Identifies a run in its records.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RunLabel {
    pub eps: f64,
    pub var: Option<f64>,
    pub run: u32,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RunState {
    pub elapsed_time: f64,
    pub step: usize,
    pub counts: CohortCounts,
    pub infections: u64,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum StepOutcome {
    Infection(EventRecord),
    Padding(EventRecord),
    /// The waiting time came out non-finite; nothing changed and the step is retried.
    Skipped,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RunSummary {
    pub steps: usize,
    pub infections: u64,
    pub elapsed_time: f64,
    /// The step at which the first padding row was written, if any.
    pub exhausted_at: Option<usize>,
}

pub struct SimulationRun<'a, M: PropensityModel + ?Sized> {
    model: &'a M,
    config: RunConfig,
    label: RunLabel,
    step_budget: usize,
    state: RunState,
    exhausted_at: Option<usize>,
}

impl<'a, M: PropensityModel + ?Sized> SimulationRun<'a, M> {
    pub fn new(model: &'a M, config: RunConfig, label: RunLabel) -> Self {
        SimulationRun {
            model,
            config,
            label,
            step_budget: model.step_budget(config.population),
            state: RunState {
                elapsed_time: 0.0,
                step: 0,
                counts: model.initial_counts(config.population),
                infections: 0,
            },
            exhausted_at: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub fn step_budget(&self) -> usize {
        self.step_budget
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.step >= self.step_budget
    }

    /// Advances the run by one step, reporting the record and the new state to `sink`.
    pub fn step<D, S>(&mut self, draws: &mut D, sink: &mut S) -> Result<StepOutcome, SimError>
    where
        D: DrawSource + ?Sized,
        S: EventSink + ?Sized,
    {
        let propensities = self.model.propensities(&self.state.counts, self.config.beta);

        let outcome = if propensities.total() < self.config.tolerance {
            self.state.step += 1;
            if self.exhausted_at.is_none() {
                trace!(
                    "run {} exhausted its susceptible pool at step {}",
                    self.label.run, self.state.step
                );
                self.exhausted_at = Some(self.state.step);
            }
            StepOutcome::Padding(self.record(true, 1.0, false))
        } else {
            let tau = waiting_time(propensities.total(), draws.draw());
            if !tau.is_finite() {
                return Ok(StepOutcome::Skipped);
            }
            let cohort = select_cohort(self.model, &self.state.counts, &propensities, draws.draw());
            self.state.counts.decrement(cohort)?;
            self.state.elapsed_time += tau;
            self.state.infections += 1;
            self.state.step += 1;
            StepOutcome::Infection(self.infection_record(cohort))
        };

        if let StepOutcome::Infection(record) | StepOutcome::Padding(record) = &outcome {
            sink.record(record)?;
        }
        sink.observe(&self.state);
        Ok(outcome)
    }

    /// Runs every remaining step of the budget.
    pub fn execute<D, S>(mut self, draws: &mut D, sink: &mut S) -> Result<RunSummary, SimError>
    where
        D: DrawSource + ?Sized,
        S: EventSink + ?Sized,
    {
        if self.state.step == 0 {
            sink.observe(&self.state);
        }
        while !self.is_finished() {
            self.step(draws, sink)?;
        }
        Ok(RunSummary {
            steps: self.state.step,
            infections: self.state.infections,
            elapsed_time: self.state.elapsed_time,
            exhausted_at: self.exhausted_at,
        })
    }

    fn infection_record(&self, cohort: Cohort) -> EventRecord {
        self.record(cohort.is_vaccinated(), self.model.efficacy(cohort), true)
    }

    fn record(&self, vaccinated: bool, efficacy: f64, infected: bool) -> EventRecord {
        EventRecord {
            eps: self.label.eps,
            var: self.label.var,
            run: self.label.run,
            step: self.state.step,
            vaccinated,
            efficacy,
            time: self.state.elapsed_time,
            infected,
        }
    }
}
