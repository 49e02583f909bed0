//! Per-step means across replicates.
//!
//! [`StepAverages`] is an [`EventSink`] that ignores records and accumulates the observed run
//! states instead: for each step index, the elapsed time and the size of every cohort. Nothing
//! in the sweep writes these means out; they are available to callers that attach the sink.

use crate::cohort::{Cohort, CohortCounts};
use crate::error::SimError;
use crate::event::{EventRecord, EventSink};
use crate::run::RunState;

#[derive(Clone, Debug)]
pub struct StepAverages {
    time_sums: Vec<f64>,
    count_sums: Vec<[f64; Cohort::COUNT]>,
    observations: Vec<u32>,
}

impl StepAverages {
    /// Reserves room for runs of `step_budget` steps, i.e. `step_budget + 1` states each.
    pub fn with_budget(step_budget: usize) -> Result<Self, SimError> {
        let len = step_budget + 1;
        let mut time_sums = Vec::new();
        time_sums.try_reserve_exact(len)?;
        time_sums.resize(len, 0.0);
        let mut count_sums = Vec::new();
        count_sums.try_reserve_exact(len)?;
        count_sums.resize(len, [0.0; Cohort::COUNT]);
        let mut observations = Vec::new();
        observations.try_reserve_exact(len)?;
        observations.resize(len, 0);
        Ok(StepAverages {
            time_sums,
            count_sums,
            observations,
        })
    }

    /// Number of replicates observed so far.
    #[must_use]
    pub fn replicates(&self) -> u32 {
        self.observations.first().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn mean_time(&self, step: usize) -> Option<f64> {
        let n = *self.observations.get(step)?;
        (n > 0).then(|| self.time_sums[step] / f64::from(n))
    }

    #[must_use]
    pub fn mean_count(&self, step: usize, cohort: Cohort) -> Option<f64> {
        let n = *self.observations.get(step)?;
        (n > 0).then(|| self.count_sums[step][cohort.index()] / f64::from(n))
    }

    /// Clears the accumulated sums, e.g. between sweep points.
    pub fn reset(&mut self) {
        self.time_sums.fill(0.0);
        self.count_sums.fill([0.0; Cohort::COUNT]);
        self.observations.fill(0);
    }

    fn accumulate(&mut self, step: usize, elapsed_time: f64, counts: &CohortCounts) {
        let Some(observations) = self.observations.get_mut(step) else {
            return;
        };
        *observations += 1;
        self.time_sums[step] += elapsed_time;
        for (cohort, count) in counts.iter() {
            self.count_sums[step][cohort.index()] += f64::from(count);
        }
    }
}

impl EventSink for StepAverages {
    fn record(&mut self, _record: &EventRecord) -> Result<(), SimError> {
        Ok(())
    }

    fn observe(&mut self, state: &RunState) {
        self.accumulate(state.step, state.elapsed_time, &state.counts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propensity::{Leaky, PropensityModel};
    use crate::run::{RunConfig, RunLabel, SimulationRun};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn means_cover_every_step_of_every_replicate() {
        let model = Leaky::new(1.0);
        let config = RunConfig {
            population: 6,
            ..RunConfig::default()
        };
        let mut averages = StepAverages::with_budget(model.step_budget(6)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for run in 1..=4 {
            let label = RunLabel { eps: 1.0, var: None, run };
            SimulationRun::new(&model, config, label)
                .execute(&mut rng, &mut averages)
                .unwrap();
        }

        assert_eq!(averages.replicates(), 4);
        assert_eq!(averages.mean_time(0), Some(0.0));
        assert_eq!(averages.mean_count(0, Cohort::Control), Some(6.0));
        // Control is exhausted after six steps in every replicate; the vaccinated never fall.
        for step in 6..=12 {
            assert_eq!(averages.mean_count(step, Cohort::Control), Some(0.0));
            assert_eq!(averages.mean_count(step, Cohort::Leaky), Some(6.0));
            assert_eq!(averages.mean_time(step), averages.mean_time(6));
        }
        assert!(averages.mean_time(6).unwrap() > 0.0);
        assert_eq!(averages.mean_time(13), None);
    }

    #[test]
    fn reset_forgets_previous_replicates() {
        let mut averages = StepAverages::with_budget(2).unwrap();
        let state = RunState {
            elapsed_time: 1.5,
            step: 1,
            counts: CohortCounts::new().with(Cohort::Control, 3),
            infections: 1,
        };
        averages.observe(&state);
        assert_eq!(averages.mean_time(1), Some(1.5));
        assert_eq!(averages.mean_time(0), None);

        averages.reset();
        assert_eq!(averages.mean_time(1), None);
        assert_eq!(averages.replicates(), 0);
    }
}
